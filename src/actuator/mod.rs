//! Actuator state domains and the two state holders built on them.
//!
//! - [`resource::ActuatorResource`]: the canonical state living on an
//!   actuator node (furnace, alarm). Validates writes, drives the indicator
//!   and notifies observers.
//! - [`mirror::ActuatorMirror`]: the edge node's local copy of a remote
//!   actuator, with the `changed` flag the dispatcher consumes.
//!
//! Both are generic over [`ActuatorValue`], so the furnace and the alarm
//! share one implementation of the change/notify discipline.

pub mod mirror;
pub mod node;
pub mod resource;

use core::fmt;

/// Which actuator a value, notification or command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorKind {
    Furnace,
    Alarm,
}

impl ActuatorKind {
    /// Resource path served by the actuator node.
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Furnace => "res_furnace",
            Self::Alarm => "res_alarm",
        }
    }

    pub fn from_resource(resource: &str) -> Option<Self> {
        match resource.trim_start_matches('/') {
            "res_furnace" => Some(Self::Furnace),
            "res_alarm" => Some(Self::Alarm),
            _ => None,
        }
    }

    /// Field name carried in command payloads.
    pub const fn field(self) -> &'static str {
        match self {
            Self::Furnace => "furnace_state",
            Self::Alarm => "alarm_state",
        }
    }
}

impl fmt::Display for ActuatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Furnace => write!(f, "furnace"),
            Self::Alarm => write!(f, "alarm"),
        }
    }
}

/// A discrete actuator state with a small integer domain.
pub trait ActuatorValue: Copy + Eq + Default + fmt::Debug {
    const KIND: ActuatorKind;

    /// Map a raw integer into the domain; `None` when out of domain.
    fn from_raw(raw: i64) -> Option<Self>;

    /// Integer form used on the wire.
    fn raw(self) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Furnace
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FurnaceState {
    #[default]
    Off = 0,
    On = 1,
}

impl ActuatorValue for FurnaceState {
    const KIND: ActuatorKind = ActuatorKind::Furnace;

    fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        self as u8
    }
}

// ───────────────────────────────────────────────────────────────
// Alarm
// ───────────────────────────────────────────────────────────────

/// Four-level energy-balance alarm. Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum AlarmLevel {
    /// Surplus: good moment to run the furnace.
    #[default]
    Safe = 0,
    /// Average consumption.
    Moderate = 1,
    /// Furnace must be shut.
    ShedLoad = 2,
    /// Power cut risk.
    CutRisk = 3,
}

impl ActuatorValue for AlarmLevel {
    const KIND: ActuatorKind = ActuatorKind::Alarm;

    fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Self::Safe),
            1 => Some(Self::Moderate),
            2 => Some(Self::ShedLoad),
            3 => Some(Self::CutRisk),
            _ => None,
        }
    }

    fn raw(self) -> u8 {
        self as u8
    }
}

// ───────────────────────────────────────────────────────────────
// Side-effect sinks
// ───────────────────────────────────────────────────────────────

/// Physical indicator for an actuator state (LEDs, relay, buzzer).
/// Invoked synchronously on every transition, before observers hear of it.
pub trait Indicator<V> {
    fn show(&mut self, value: V);
}

/// Press-duration classification shared by the edge and furnace buttons.
pub const LONG_PRESS_SECS: u64 = 3;

/// `true` when a release after `held` counts as a long press.
pub fn is_long_press(held: core::time::Duration) -> bool {
    held.as_secs() >= LONG_PRESS_SECS
}
