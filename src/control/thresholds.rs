//! Threshold store: control thresholds and the auto/manual furnace mode.
//!
//! Updates arrive as partial [`ThresholdUpdate`]s (from a PUT on the
//! threshold resource or from the edge button). They are validated against
//! the *merged* result and committed all-or-nothing.

use log::info;

use crate::error::PayloadError;

/// Thresholds the control policy reads on every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    /// At or below this energy balance the furnace may run.
    pub threshold_on: i32,
    /// At or above this energy balance the furnace must stop.
    pub threshold_off: i32,
    /// When false the policy never touches the furnace.
    pub auto_furnace_ctrl: bool,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            threshold_on: 1000,
            threshold_off: 3000,
            auto_furnace_ctrl: true,
        }
    }
}

impl ThresholdConfig {
    /// Power-cut band start: `threshold_off` plus `margin_percent` of it.
    /// Integer arithmetic, truncating toward zero.
    pub fn threshold_cut(&self, margin_percent: u8) -> i32 {
        let off = i64::from(self.threshold_off);
        let cut = off + off * i64::from(margin_percent) / 100;
        cut.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.threshold_off <= self.threshold_on {
            return Err(PayloadError::OutOfRange("threshold_off"));
        }
        Ok(())
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThresholdUpdate {
    pub threshold_on: Option<i32>,
    pub threshold_off: Option<i32>,
    pub auto_furnace_ctrl: Option<bool>,
}

impl ThresholdUpdate {
    pub fn is_empty(&self) -> bool {
        self.threshold_on.is_none() && self.threshold_off.is_none() && self.auto_furnace_ctrl.is_none()
    }

    pub fn auto(enabled: bool) -> Self {
        Self {
            auto_furnace_ctrl: Some(enabled),
            ..Self::default()
        }
    }
}

/// What an accepted update actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThresholdChange {
    pub thresholds_changed: bool,
    pub auto_changed: bool,
}

impl ThresholdChange {
    pub fn any(&self) -> bool {
        self.thresholds_changed || self.auto_changed
    }
}

pub struct ThresholdStore {
    current: ThresholdConfig,
}

impl ThresholdStore {
    pub fn new(initial: ThresholdConfig) -> Self {
        Self { current: initial }
    }

    pub fn get(&self) -> ThresholdConfig {
        self.current
    }

    /// Merge, validate, commit. On error nothing changes.
    pub fn apply(&mut self, update: ThresholdUpdate) -> Result<ThresholdChange, PayloadError> {
        let merged = ThresholdConfig {
            threshold_on: update.threshold_on.unwrap_or(self.current.threshold_on),
            threshold_off: update.threshold_off.unwrap_or(self.current.threshold_off),
            auto_furnace_ctrl: update.auto_furnace_ctrl.unwrap_or(self.current.auto_furnace_ctrl),
        };
        merged.validate()?;

        let change = ThresholdChange {
            thresholds_changed: merged.threshold_on != self.current.threshold_on
                || merged.threshold_off != self.current.threshold_off,
            auto_changed: merged.auto_furnace_ctrl != self.current.auto_furnace_ctrl,
        };
        if change.any() {
            info!(
                "Thresholds: on={} off={} auto={}",
                merged.threshold_on, merged.threshold_off, merged.auto_furnace_ctrl
            );
        }
        self.current = merged;
        Ok(change)
    }
}
