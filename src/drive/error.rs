use super::device::{CanPort, DeviceError};

/// Invalid tuning value passed to the factory builder
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// Bring-up stage that failed during `create`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    Open,
    ConfigureAll,
    VoltageCompensation,
    NeutralMode,
    Inversion,
    SensorPhase,
    StatusFramePeriod,
}

impl std::fmt::Display for InitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InitStep::Open => "open",
            InitStep::ConfigureAll => "configure all settings",
            InitStep::VoltageCompensation => "enable voltage compensation",
            InitStep::NeutralMode => "set neutral mode",
            InitStep::Inversion => "set inversion",
            InitStep::SensorPhase => "set sensor phase",
            InitStep::StatusFramePeriod => "set status frame period",
        };
        f.write_str(name)
    }
}

/// Errors raised by drive controller creation and operation
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Failed to initialize drive motor {port} ({step}): {source}")]
    DeviceInitialization {
        port: CanPort,
        step: InitStep,
        #[source]
        source: DeviceError,
    },

    #[error("Transport error on drive motor {port}: {source}")]
    Transport {
        port: CanPort,
        #[source]
        source: DeviceError,
    },
}

pub type Result<T> = std::result::Result<T, DriveError>;
