//! Node configuration.
//!
//! All tunables for the edge node. Defaults reproduce the deployed mesh;
//! a TOML file may override any subset of fields.

use std::net::Ipv6Addr;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::coap::Endpoint;
use crate::control::policy::{ControlPolicy, LinearModel};
use crate::control::thresholds::ThresholdConfig;
use crate::error::ConfigError;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Identity ---
    /// Identifier announced to the registry
    pub node_id: String,

    // --- Registry ---
    /// Address of the registry / lookup server
    pub registry_addr: String,
    /// Textual prefix every resolved peer address must start with
    pub mesh_prefix: String,

    // --- Timing ---
    /// Delay between two lookups of the same resource (milliseconds)
    pub discovery_retry_ms: u64,
    /// How long one fresh sample waits for its counterpart (milliseconds)
    pub fusion_timeout_ms: u64,

    // --- Policy ---
    /// Multiplier applied to the truncated model output
    pub prediction_scale: i32,
    /// Cut band starts this many percent above `threshold_off`
    pub cut_margin_percent: u8,
    pub threshold_on: i32,
    pub threshold_off: i32,
    pub auto_furnace_ctrl: bool,

    // --- Model ---
    pub model: LinearModel,

    // --- Logging ---
    /// One of off/error/warn/info/debug/trace
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let thresholds = ThresholdConfig::default();
        Self {
            node_id: "nodoEdge".into(),

            registry_addr: "fd00::1".into(),
            mesh_prefix: "fd00::".into(),

            discovery_retry_ms: 500,
            fusion_timeout_ms: 15_000,

            prediction_scale: 2,
            cut_margin_percent: 30,
            threshold_on: thresholds.threshold_on,
            threshold_off: thresholds.threshold_off,
            auto_furnace_ctrl: thresholds.auto_furnace_ctrl,

            model: LinearModel::default(),

            log_level: "info".into(),
        }
    }
}

impl NodeConfig {
    /// Read `path` as TOML. A missing file yields the defaults; an
    /// unreadable, unparsable or invalid one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("Config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!("Config: cannot read {}: {}", path.display(), e);
            ConfigError::Io
        })?;
        let config = Self::from_toml(&content)?;
        info!("Config: loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| {
            warn!("Config: parse error: {}", e);
            ConfigError::Parse
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("node_id must not be empty"));
        }
        if self.registry_addr.trim().parse::<Ipv6Addr>().is_err() {
            return Err(ConfigError::ValidationFailed("registry_addr is not an IPv6 address"));
        }
        if self.mesh_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("mesh_prefix must not be empty"));
        }
        if self.discovery_retry_ms == 0 {
            return Err(ConfigError::ValidationFailed("discovery_retry_ms must be > 0"));
        }
        if self.fusion_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("fusion_timeout_ms must be > 0"));
        }
        if self.prediction_scale <= 0 {
            return Err(ConfigError::ValidationFailed("prediction_scale must be > 0"));
        }
        if self.cut_margin_percent > 100 {
            return Err(ConfigError::ValidationFailed("cut_margin_percent must be <= 100"));
        }
        if self.threshold_off <= self.threshold_on {
            return Err(ConfigError::ValidationFailed("threshold_off must exceed threshold_on"));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::ValidationFailed("log_level is not a known level"));
        }
        Ok(())
    }

    pub fn registry_endpoint(&self) -> Result<Endpoint, ConfigError> {
        self.registry_addr
            .trim()
            .parse::<Ipv6Addr>()
            .map(Endpoint::new)
            .map_err(|_| ConfigError::ValidationFailed("registry_addr is not an IPv6 address"))
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        ThresholdConfig {
            threshold_on: self.threshold_on,
            threshold_off: self.threshold_off,
            auto_furnace_ctrl: self.auto_furnace_ctrl,
        }
    }

    pub fn policy(&self) -> ControlPolicy {
        ControlPolicy::new(self.prediction_scale, self.cut_margin_percent)
    }

    pub fn discovery_retry(&self) -> Duration {
        Duration::from_millis(self.discovery_retry_ms)
    }

    pub fn fusion_timeout(&self) -> Duration {
        Duration::from_millis(self.fusion_timeout_ms)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
