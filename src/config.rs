// Timeouts, topics, drive module configuration
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::drive::{CanPort, ModuleConfiguration, ModulePreset};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics are namespaced per module: swerve/<module>/...
pub const TOPIC_PREFIX: &str = "swerve";

pub fn topic_cmd_drive(module: &str) -> String {
    format!("{}/{}/cmd/drive", TOPIC_PREFIX, module) // commands
}

pub fn topic_rt_drive(module: &str) -> String {
    format!("{}/{}/rt/drive", TOPIC_PREFIX, module) // measured state
}

pub fn topic_health(module: &str) -> String {
    format!("{}/{}/state/health", TOPIC_PREFIX, module) // health status
}

/// Either a named preset or an explicit geometry
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GeometryConfig {
    Preset(ModulePreset),
    Custom(ModuleConfiguration),
}

impl GeometryConfig {
    pub fn module_configuration(&self) -> ModuleConfiguration {
        match self {
            GeometryConfig::Preset(preset) => preset.configuration(),
            GeometryConfig::Custom(module) => *module,
        }
    }
}

/// Runtime settings for one drive module, loaded from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Module name, used in topic names
    pub module: String,
    pub port: CanPort,
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub nominal_voltage: Option<f64>,
    #[serde(default)]
    pub current_limit: Option<f64>,
    /// Run against simulated motors instead of hardware
    #[serde(default = "default_simulate")]
    pub simulate: bool,
}

fn default_simulate() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            module: "front_left".to_string(),
            port: CanPort::on_default_bus(1),
            geometry: GeometryConfig::Preset(ModulePreset::Mk4L2),
            nominal_voltage: Some(12.0),
            current_limit: Some(80.0),
            simulate: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {field} must be a positive number, got {value}")]
    Invalid { field: &'static str, value: f64 },
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigFileError> {
    // NaN fails the comparison as well
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigFileError::Invalid { field, value })
    }
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigFileError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would give a NaN output or non-positive coefficients
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        if let Some(voltage) = self.nominal_voltage {
            positive("nominal_voltage", voltage)?;
        }
        if let Some(limit) = self.current_limit {
            positive("current_limit", limit)?;
        }
        let module = self.geometry.module_configuration();
        positive("wheel_diameter", module.wheel_diameter())?;
        positive("drive_reduction", module.drive_reduction())
    }
}
