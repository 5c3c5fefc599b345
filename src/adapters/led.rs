//! LED indicator adapters.
//!
//! Discrete R/G/B LEDs and the single auto-control lamp, driven through
//! `embedded-hal` output pins. Pin errors are logged and otherwise ignored:
//! an indicator never blocks a state transition.
//!
//! | Indicator        | State            | Colour        |
//! |------------------|------------------|---------------|
//! | alarm            | 0 safe           | blue          |
//! |                  | 1 moderate       | green         |
//! |                  | 2 shed load      | red           |
//! |                  | 3 cut risk       | red + blue    |
//! | furnace          | off              | red + blue    |
//! |                  | on               | green         |
//! | auto-control     | on / off         | lamp on / off |

use core::cell::Cell;
use core::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin, PinState};
use log::warn;

use crate::actuator::{AlarmLevel, FurnaceState, Indicator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Colour {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Colour {
    pub const OFF: Self = Self::rgb(false, false, false);
    pub const RED: Self = Self::rgb(true, false, false);
    pub const GREEN: Self = Self::rgb(false, true, false);
    pub const BLUE: Self = Self::rgb(false, false, true);
    pub const PURPLE: Self = Self::rgb(true, false, true);

    pub const fn rgb(red: bool, green: bool, blue: bool) -> Self {
        Self { red, green, blue }
    }
}

impl From<AlarmLevel> for Colour {
    fn from(level: AlarmLevel) -> Self {
        match level {
            AlarmLevel::Safe => Self::BLUE,
            AlarmLevel::Moderate => Self::GREEN,
            AlarmLevel::ShedLoad => Self::RED,
            AlarmLevel::CutRisk => Self::PURPLE,
        }
    }
}

impl From<FurnaceState> for Colour {
    fn from(state: FurnaceState) -> Self {
        match state {
            FurnaceState::Off => Self::PURPLE,
            FurnaceState::On => Self::GREEN,
        }
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool, name: &str) {
    if let Err(e) = pin.set_state(PinState::from(on)) {
        warn!("LED: {} pin error {:?}", name, e);
    }
}

// ───────────────────────────────────────────────────────────────
// RGB LED
// ───────────────────────────────────────────────────────────────

pub struct RgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
    current: Colour,
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> RgbLed<R, G, B> {
    pub fn new(red: R, green: G, blue: B) -> Self {
        let mut led = Self {
            red,
            green,
            blue,
            current: Colour::OFF,
        };
        led.set(Colour::OFF);
        led
    }

    pub fn set(&mut self, colour: Colour) {
        drive(&mut self.red, colour.red, "red");
        drive(&mut self.green, colour.green, "green");
        drive(&mut self.blue, colour.blue, "blue");
        self.current = colour;
    }

    pub fn current(&self) -> Colour {
        self.current
    }
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> Indicator<AlarmLevel> for RgbLed<R, G, B> {
    fn show(&mut self, value: AlarmLevel) {
        self.set(value.into());
    }
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> Indicator<FurnaceState> for RgbLed<R, G, B> {
    fn show(&mut self, value: FurnaceState) {
        self.set(value.into());
    }
}

// ───────────────────────────────────────────────────────────────
// Auto-control lamp
// ───────────────────────────────────────────────────────────────

pub struct Lamp<P> {
    pin: P,
}

impl<P: OutputPin> Lamp<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> Indicator<bool> for Lamp<P> {
    fn show(&mut self, on: bool) {
        drive(&mut self.pin, on, "lamp");
    }
}

// ───────────────────────────────────────────────────────────────
// In-memory pin (host / simulation)
// ───────────────────────────────────────────────────────────────

/// Output pin that only remembers its level. Clones share the level, so a
/// test can keep one handle while the LED owns another.
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    level: Rc<Cell<bool>>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.level.get()
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(true);
        Ok(())
    }
}

/// RGB LED on three simulated pins.
pub type SimRgbLed = RgbLed<SimPin, SimPin, SimPin>;

pub fn sim_rgb_led() -> SimRgbLed {
    RgbLed::new(SimPin::new(), SimPin::new(), SimPin::new())
}
