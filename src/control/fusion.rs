//! Data fusion controller.
//!
//! Pairs the latest roof and power samples into one prediction cycle.
//!
//! ```text
//!              sample (one side)          sample (other side)
//!   ┌───────┐ ─────────────────▶ ┌───────┐ ─────────────────▶ Fire(missing=false)
//!   │ Empty │                    │ Armed │
//!   └───────┘ ◀───────────────── └───────┘ ─────────────────▶ Fire(missing=true)
//!                 fire / clear          timeout(token)
//! ```
//!
//! The controller never owns a timer. Arming returns a [`TimeoutToken`];
//! the node task schedules the deadline and hands the token back through
//! [`FusionController::on_missing_timeout`]. A token from an earlier arming
//! is ignored, which is how completeness implicitly cancels the timer.

use log::{debug, info};

use super::sample::{PowerSample, RoofSample, SensorSample};

/// Identifies one arming of the missing-data timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutToken(u32);

/// Freshness flags. `timeout_armed` is true only while one side is waiting
/// for its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FusionState {
    pub roof_fresh: bool,
    pub power_fresh: bool,
    pub timeout_armed: bool,
}

/// Inputs to one prediction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusedInputs {
    pub roof: RoofSample,
    pub power: PowerSample,
    /// True when the cycle ran on the timeout path with one side stale.
    pub missing: bool,
}

/// What the caller must do after feeding a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionStep {
    /// Both sides fresh: run the cycle now.
    Fire(FusedInputs),
    /// One side fresh: schedule the missing-data timeout for this token.
    ArmTimeout(TimeoutToken),
    /// A timeout is already pending; nothing to do.
    Waiting,
}

pub struct FusionController {
    roof: RoofSample,
    power: PowerSample,
    state: FusionState,
    generation: u32,
}

impl Default for FusionController {
    fn default() -> Self {
        Self::new()
    }
}

impl FusionController {
    pub fn new() -> Self {
        Self {
            roof: RoofSample::default(),
            power: PowerSample::default(),
            state: FusionState::default(),
            generation: 0,
        }
    }

    pub fn state(&self) -> FusionState {
        self.state
    }

    /// Latest roof sample (or the boot default).
    pub fn roof(&self) -> &RoofSample {
        &self.roof
    }

    /// Latest power sample (or the boot default).
    pub fn power(&self) -> &PowerSample {
        &self.power
    }

    pub fn on_roof_sample(&mut self, sample: RoofSample) -> FusionStep {
        self.on_sample(SensorSample::Roof(sample))
    }

    pub fn on_power_sample(&mut self, sample: PowerSample) -> FusionStep {
        self.on_sample(SensorSample::Power(sample))
    }

    /// Store the sample together with its freshness flag, then re-evaluate.
    pub fn on_sample(&mut self, sample: SensorSample) -> FusionStep {
        match sample {
            SensorSample::Roof(r) => {
                self.roof = r;
                self.state.roof_fresh = true;
            }
            SensorSample::Power(p) => {
                self.power = p;
                self.state.power_fresh = true;
            }
        }
        self.evaluate()
    }

    /// The missing-data timer elapsed. Fires only for the current arming.
    pub fn on_missing_timeout(&mut self, token: TimeoutToken) -> Option<FusedInputs> {
        if !self.state.timeout_armed || token.0 != self.generation {
            debug!("Fusion: stale timeout {:?} ignored", token);
            return None;
        }
        info!(
            "Fusion: timeout with roof_fresh={} power_fresh={}, using last known values",
            self.state.roof_fresh, self.state.power_fresh
        );
        Some(self.fire(true))
    }

    // ── Internal ──────────────────────────────────────────────

    fn evaluate(&mut self) -> FusionStep {
        // Completeness wins over arming.
        if self.state.roof_fresh && self.state.power_fresh {
            return FusionStep::Fire(self.fire(false));
        }
        if self.state.timeout_armed {
            return FusionStep::Waiting;
        }
        self.generation = self.generation.wrapping_add(1);
        self.state.timeout_armed = true;
        debug!("Fusion: waiting for counterpart (token {})", self.generation);
        FusionStep::ArmTimeout(TimeoutToken(self.generation))
    }

    fn fire(&mut self, missing: bool) -> FusedInputs {
        // Moving past the current generation invalidates any pending timer.
        if self.state.timeout_armed {
            self.generation = self.generation.wrapping_add(1);
        }
        self.state = FusionState::default();
        FusedInputs {
            roof: self.roof,
            power: self.power,
            missing,
        }
    }
}
