//! Control policy: prediction, energy balance, furnace and alarm rules.
//!
//! Everything here is pure. [`ControlPolicy::evaluate`] takes the fused
//! inputs, the current thresholds and the current mirror values, and returns
//! the targets that *differ* from the current values. Committing them (and
//! setting the `changed` flags) is the caller's job.

use log::{debug, info};
use serde::Deserialize;
use serde::Serialize;

use super::fusion::FusedInputs;
use super::sample::{PowerSample, RoofSample};
use super::thresholds::ThresholdConfig;
use crate::actuator::{AlarmLevel, FurnaceState};

/// Number of model input features.
pub const FEATURE_COUNT: usize = 5;

/// Next-period power regressor. Treated as an opaque pure function.
pub trait Predictor {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> f32;
}

/// Linear stand-in for the regression model: `bias + Σ wᵢ·xᵢ`.
///
/// The default weights reproduce a persistence forecast (`power/100 × 50`,
/// i.e. half the current draw before the ×2 policy scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub bias: f32,
    pub weights: [f32; FEATURE_COUNT],
}

impl Default for LinearModel {
    fn default() -> Self {
        Self {
            bias: 0.0,
            weights: [50.0, 0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl Predictor for LinearModel {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> f32 {
        self.weights
            .iter()
            .zip(features)
            .fold(self.bias, |acc, (w, x)| acc + w * x)
    }
}

/// Model inputs: (power/100, month, hour, temperature, humidity).
pub fn features(roof: &RoofSample, power: &PowerSample) -> [f32; FEATURE_COUNT] {
    [
        power.power as f32 / 100.0,
        roof.month as f32,
        roof.hour as f32,
        roof.temperature as f32,
        roof.humidity as f32,
    ]
}

/// Output of one prediction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredictionResult {
    pub timestamp: u64,
    /// Predicted power, already scaled.
    pub next_power: i32,
    /// Carried over from the roof sample.
    pub next_solar: i32,
    pub missing: bool,
}

/// Result of [`ControlPolicy::evaluate`]. `None` means "keep current".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub prediction: PredictionResult,
    pub energy_diff: i32,
    pub furnace: Option<FurnaceState>,
    pub alarm: Option<AlarmLevel>,
}

/// Map an energy balance onto the four alarm bands.
///
/// Total over `i32`; boundaries belong to the lower band.
pub fn alarm_band(energy_diff: i32, thresholds: &ThresholdConfig, cut_margin_percent: u8) -> AlarmLevel {
    let cut = thresholds.threshold_cut(cut_margin_percent);
    if energy_diff <= thresholds.threshold_on {
        AlarmLevel::Safe
    } else if energy_diff <= thresholds.threshold_off {
        AlarmLevel::Moderate
    } else if energy_diff <= cut {
        AlarmLevel::ShedLoad
    } else {
        AlarmLevel::CutRisk
    }
}

/// Hysteresis furnace rule. Returns the new state only on a transition;
/// the dead zone between the thresholds holds the current state.
pub fn furnace_decision(energy_diff: i32, thresholds: &ThresholdConfig, current: FurnaceState) -> Option<FurnaceState> {
    if !thresholds.auto_furnace_ctrl {
        return None;
    }
    match current {
        FurnaceState::Off if energy_diff <= thresholds.threshold_on => Some(FurnaceState::On),
        FurnaceState::On if energy_diff >= thresholds.threshold_off => Some(FurnaceState::Off),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPolicy {
    /// Multiplier applied to the truncated model output.
    pub prediction_scale: i32,
    pub cut_margin_percent: u8,
}

impl Default for ControlPolicy {
    fn default() -> Self {
        Self {
            prediction_scale: 2,
            cut_margin_percent: 30,
        }
    }
}

impl ControlPolicy {
    pub fn new(prediction_scale: i32, cut_margin_percent: u8) -> Self {
        Self {
            prediction_scale,
            cut_margin_percent,
        }
    }

    /// Clamp negative model output to zero, truncate, then scale.
    pub fn scale_prediction(&self, raw: f32) -> i32 {
        // `as` saturates and maps NaN to 0.
        let truncated = raw.max(0.0) as i32;
        truncated.saturating_mul(self.prediction_scale)
    }

    pub fn evaluate<M: Predictor + ?Sized>(
        &self,
        model: &M,
        inputs: &FusedInputs,
        thresholds: &ThresholdConfig,
        furnace: FurnaceState,
        alarm: AlarmLevel,
        timestamp: u64,
    ) -> PolicyOutcome {
        let raw = model.predict(&features(&inputs.roof, &inputs.power));
        let next_power = self.scale_prediction(raw);
        let next_solar = inputs.roof.next_solar;
        let energy_diff = next_power.saturating_sub(next_solar);

        debug!(
            "Policy: raw={:.2} next_power={} next_solar={} diff={}",
            raw, next_power, next_solar, energy_diff
        );

        let furnace_target = furnace_decision(energy_diff, thresholds, furnace);
        let band = alarm_band(energy_diff, thresholds, self.cut_margin_percent);
        let alarm_target = (band != alarm).then_some(band);

        if let Some(f) = furnace_target {
            info!("Policy: furnace {:?} -> {:?} (diff={})", furnace, f, energy_diff);
        }
        if let Some(a) = alarm_target {
            info!("Policy: alarm {:?} -> {:?} (diff={})", alarm, a, energy_diff);
        }

        PolicyOutcome {
            prediction: PredictionResult {
                timestamp,
                next_power,
                next_solar,
                missing: inputs.missing,
            },
            energy_diff,
            furnace: furnace_target,
            alarm: alarm_target,
        }
    }
}
