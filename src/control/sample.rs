//! Sensor samples received from the roof and power nodes.
//!
//! Field names on the wire follow the sensor firmware (`mese`/`ora` for
//! month/hour); the Rust side uses English names and serde renames.

use serde::{Deserialize, Serialize};

/// Reading from the roof node: irradiance, weather and its own solar forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoofSample {
    pub solar: i32,
    /// Month of year, 1–12.
    #[serde(rename = "mese")]
    pub month: i32,
    /// Hour of day, 0–23.
    #[serde(rename = "ora")]
    pub hour: i32,
    #[serde(rename = "temp")]
    pub temperature: i32,
    #[serde(rename = "humid")]
    pub humidity: i32,
    /// Solar production the roof node forecasts for the next period.
    #[serde(rename = "nextSolar")]
    pub next_solar: i32,
}

impl Default for RoofSample {
    fn default() -> Self {
        Self {
            solar: 0,
            month: 1,
            hour: 0,
            temperature: 0,
            humidity: 0,
            next_solar: 0,
        }
    }
}

/// Reading from the power node: instantaneous household consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSample {
    pub power: i32,
}

impl Default for PowerSample {
    fn default() -> Self {
        Self { power: 1000 }
    }
}

/// One sample of either kind, as delivered to the fusion controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSample {
    Roof(RoofSample),
    Power(PowerSample),
}
