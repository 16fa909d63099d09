// Physical swerve module geometry and standard SDS module presets
//
// Reductions are expressed as wheel revolutions per motor revolution,
// i.e. the product of each stage's driving/driven tooth ratio.

use serde::{Deserialize, Serialize};

/// Mechanical description of one swerve module
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfiguration {
    wheel_diameter: f64,
    drive_reduction: f64,
    drive_inverted: bool,
    #[serde(default = "default_steer_reduction")]
    steer_reduction: f64,
    #[serde(default)]
    steer_inverted: bool,
}

fn default_steer_reduction() -> f64 {
    MK4_L1.steer_reduction
}

impl ModuleConfiguration {
    pub const fn new(
        wheel_diameter: f64,
        drive_reduction: f64,
        drive_inverted: bool,
        steer_reduction: f64,
        steer_inverted: bool,
    ) -> Self {
        Self {
            wheel_diameter,
            drive_reduction,
            drive_inverted,
            steer_reduction,
            steer_inverted,
        }
    }

    /// Wheel diameter in meters
    pub fn wheel_diameter(&self) -> f64 {
        self.wheel_diameter
    }

    pub fn drive_reduction(&self) -> f64 {
        self.drive_reduction
    }

    pub fn is_drive_inverted(&self) -> bool {
        self.drive_inverted
    }

    pub fn steer_reduction(&self) -> f64 {
        self.steer_reduction
    }

    pub fn is_steer_inverted(&self) -> bool {
        self.steer_inverted
    }
}

pub const MK3_STANDARD: ModuleConfiguration = ModuleConfiguration::new(
    0.1016,
    (14.0 / 50.0) * (28.0 / 16.0) * (15.0 / 60.0),
    true,
    (15.0 / 32.0) * (10.0 / 60.0),
    true,
);

pub const MK3_FAST: ModuleConfiguration = ModuleConfiguration::new(
    0.1016,
    (16.0 / 48.0) * (28.0 / 16.0) * (15.0 / 60.0),
    true,
    (15.0 / 32.0) * (10.0 / 60.0),
    true,
);

pub const MK4_L1: ModuleConfiguration = ModuleConfiguration::new(
    0.10033,
    (14.0 / 50.0) * (25.0 / 19.0) * (15.0 / 45.0),
    true,
    (15.0 / 32.0) * (10.0 / 60.0),
    true,
);

pub const MK4_L2: ModuleConfiguration = ModuleConfiguration::new(
    0.10033,
    (14.0 / 50.0) * (27.0 / 17.0) * (15.0 / 45.0),
    true,
    (15.0 / 32.0) * (10.0 / 60.0),
    true,
);

pub const MK4_L3: ModuleConfiguration = ModuleConfiguration::new(
    0.10033,
    (14.0 / 50.0) * (28.0 / 16.0) * (15.0 / 45.0),
    true,
    (15.0 / 32.0) * (10.0 / 60.0),
    true,
);

pub const MK4_L4: ModuleConfiguration = ModuleConfiguration::new(
    0.10033,
    (16.0 / 48.0) * (28.0 / 16.0) * (15.0 / 45.0),
    true,
    (15.0 / 32.0) * (10.0 / 60.0),
    true,
);

// MK4i steer gearing is mounted upside down relative to the MK4
pub const MK4I_L1: ModuleConfiguration = ModuleConfiguration::new(
    0.10033,
    (14.0 / 50.0) * (25.0 / 19.0) * (15.0 / 45.0),
    true,
    (14.0 / 50.0) * (10.0 / 60.0),
    false,
);

pub const MK4I_L2: ModuleConfiguration = ModuleConfiguration::new(
    0.10033,
    (14.0 / 50.0) * (27.0 / 17.0) * (15.0 / 45.0),
    true,
    (14.0 / 50.0) * (10.0 / 60.0),
    false,
);

pub const MK4I_L3: ModuleConfiguration = ModuleConfiguration::new(
    0.10033,
    (14.0 / 50.0) * (28.0 / 16.0) * (15.0 / 45.0),
    true,
    (14.0 / 50.0) * (10.0 / 60.0),
    false,
);

/// Named module preset, selectable from a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulePreset {
    Mk3Standard,
    Mk3Fast,
    Mk4L1,
    Mk4L2,
    Mk4L3,
    Mk4L4,
    Mk4iL1,
    Mk4iL2,
    Mk4iL3,
}

impl ModulePreset {
    pub fn configuration(self) -> ModuleConfiguration {
        match self {
            ModulePreset::Mk3Standard => MK3_STANDARD,
            ModulePreset::Mk3Fast => MK3_FAST,
            ModulePreset::Mk4L1 => MK4_L1,
            ModulePreset::Mk4L2 => MK4_L2,
            ModulePreset::Mk4L3 => MK4_L3,
            ModulePreset::Mk4L4 => MK4_L4,
            ModulePreset::Mk4iL1 => MK4I_L1,
            ModulePreset::Mk4iL2 => MK4I_L2,
            ModulePreset::Mk4iL3 => MK4I_L3,
        }
    }
}
