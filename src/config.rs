//! Configuration loading and validation
//!
//! Settings are read from a TOML file; every section has defaults, so a
//! missing file or a partial file is fine. The seed alert rules live in
//! configuration rather than code: the `[[rules]]` tables replace the
//! built-in defaults entirely when present.

use crate::alerts::rules::AlertRule;
use crate::alerts::FiringMode;
use crate::error::ConfigError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Level- or edge-triggered alert firing
    pub firing_mode: FiringMode,
    /// Stream buffer settings
    pub buffer: BufferConfig,
    /// Alert lifecycle settings
    pub alerts: AlertsConfig,
    /// Derived-statistics defaults
    pub statistics: StatisticsConfig,
    /// Simulated-source settings for the demo binary
    pub simulator: SimulatorConfig,
    /// Seed alert rules; defaults to the built-in wearable vitals rules
    pub rules: Vec<AlertRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firing_mode: FiringMode::default(),
            buffer: BufferConfig::default(),
            alerts: AlertsConfig::default(),
            statistics: StatisticsConfig::default(),
            simulator: SimulatorConfig::default(),
            rules: AlertRule::default_rules(),
        }
    }
}

/// Stream buffer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum samples retained per stream
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

/// Alert lifecycle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Maximum alert history entries retained
    pub history_limit: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
        }
    }
}

/// Derived-statistics defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Moving-average window size
    pub average_window: usize,
    /// Number of samples examined by trend classification
    pub trend_lookback: usize,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            average_window: 10,
            trend_lookback: 5,
        }
    }
}

/// Simulated-source settings for the demo binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Emission period in milliseconds
    pub interval_ms: u64,
    /// Devices the simulator emits for
    pub devices: Vec<String>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            devices: vec!["wearable-1".to_string(), "wearable-2".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ReadError(format!("{}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults
    ///
    /// A missing path or missing file logs a warning and returns the
    /// defaults; a file that exists but fails to parse or validate is an
    /// error, so misconfiguration is never silently ignored.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                warn!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "buffer.capacity must be greater than 0".to_string(),
            ));
        }
        if self.alerts.history_limit == 0 {
            return Err(ConfigError::ValidationError(
                "alerts.history_limit must be greater than 0".to_string(),
            ));
        }
        if self.statistics.average_window == 0 {
            return Err(ConfigError::ValidationError(
                "statistics.average_window must be greater than 0".to_string(),
            ));
        }
        if self.statistics.trend_lookback < 2 {
            return Err(ConfigError::ValidationError(
                "statistics.trend_lookback must be at least 2".to_string(),
            ));
        }
        if self.simulator.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "simulator.interval_ms must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.is_empty() {
                return Err(ConfigError::ValidationError(
                    "rule ids must be non-empty".to_string(),
                ));
            }
            if !seen.insert(&rule.id) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate rule id '{}'",
                    rule.id
                )));
            }
        }
        Ok(())
    }
}
