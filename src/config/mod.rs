//! Configuration loaded from a TOML file
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Sections map one-to-one onto pipeline components.

use crate::alerts::gate::{DEFAULT_GATE_PROBABILITY, DEFAULT_GATE_SENSOR_RISK};
use crate::alerts::AlertThresholds;
use crate::error::ConfigError;
use crate::events::DEFAULT_SECTORS;
use crate::scoring::ScoringMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub scoring: ScoringConfig,
    pub alerts: AlertConfig,
    pub storage: StorageConfig,
    pub client: ClientConfig,
}

/// Reading generation and trigger cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Sectors sampled on every trigger cycle, in order
    pub sectors: Vec<String>,
    /// Period of the persisted-path trigger
    pub interval_seconds: u64,
    /// Period of the local simulation
    pub local_interval_ms: u64,
    /// Fixed seed for every random source; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sectors: DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect(),
            interval_seconds: 10,
            local_interval_ms: 2000,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn local_interval(&self) -> Duration {
        Duration::from_millis(self.local_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModeName {
    #[default]
    Step,
    MovingAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub mode: ScoringModeName,
    /// Readings averaged in moving-average mode
    pub window: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringModeName::Step,
            window: 5,
        }
    }
}

impl ScoringConfig {
    pub fn scoring_mode(&self) -> ScoringMode {
        match self.mode {
            ScoringModeName::Step => ScoringMode::Step,
            ScoringModeName::MovingAverage => ScoringMode::MovingAverage {
                window: self.window,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub alert_above: u8,
    pub danger_above: u8,
    /// Admission probability of the local-path gate
    pub gate_probability: f64,
    /// Sensor risk the local-path gate requires
    pub gate_sensor_risk: u8,
}

impl Default for AlertConfig {
    fn default() -> Self {
        let thresholds = AlertThresholds::default();
        Self {
            alert_above: thresholds.alert_above,
            danger_above: thresholds.danger_above,
            gate_probability: DEFAULT_GATE_PROBABILITY,
            gate_sensor_risk: DEFAULT_GATE_SENSOR_RISK,
        }
    }
}

impl AlertConfig {
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            alert_above: self.alert_above,
            danger_above: self.danger_above,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database file, used by the sqlite backend only
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("pitwatch.db"),
        }
    }
}

/// Observer buffer sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub reading_buffer: usize,
    pub alert_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reading_buffer: 50,
            alert_buffer: 10,
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// `ReadError` when the file cannot be read, `ParseError` for malformed
    /// TOML and `ValidationError` for out-of-range values
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.simulation.sectors.is_empty() {
            return invalid("simulation.sectors must name at least one sector".to_string());
        }
        if let Some(position) = self
            .simulation
            .sectors
            .iter()
            .position(|s| s.trim().is_empty())
        {
            return invalid(format!("simulation.sectors[{}] is empty", position));
        }
        if self.simulation.interval_seconds == 0 {
            return invalid("simulation.interval_seconds must be positive".to_string());
        }
        if self.simulation.local_interval_ms == 0 {
            return invalid("simulation.local_interval_ms must be positive".to_string());
        }
        if self.scoring.window == 0 {
            return invalid("scoring.window must be at least 1".to_string());
        }
        if self.alerts.danger_above > 100 {
            return invalid(format!(
                "alerts.danger_above must be at most 100, got {}",
                self.alerts.danger_above
            ));
        }
        if self.alerts.alert_above > self.alerts.danger_above {
            return invalid(format!(
                "alerts.alert_above ({}) must not exceed alerts.danger_above ({})",
                self.alerts.alert_above, self.alerts.danger_above
            ));
        }
        if !(0.0..=1.0).contains(&self.alerts.gate_probability) {
            return invalid(format!(
                "alerts.gate_probability must be within [0, 1], got {}",
                self.alerts.gate_probability
            ));
        }
        if self.client.reading_buffer == 0 || self.client.alert_buffer == 0 {
            return invalid("client buffers must hold at least one entry".to_string());
        }
        Ok(())
    }
}
