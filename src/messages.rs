// Message types exchanged with the drive runtime

use serde::{Deserialize, Serialize};

// Command from the swerve module layer -> runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveCommand {
    /// Drive motor voltage in volts
    pub voltage: f64,
}

// Measured wheel state from runtime -> module layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct DriveState {
    /// m/s
    pub velocity: f64,
    /// m
    pub position: f64,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    /// Last motor transaction failed
    Fault,
}
