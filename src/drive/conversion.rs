// Sensor unit conversion: raw encoder ticks -> wheel distance and speed

use std::f64::consts::PI;

use super::geometry::ModuleConfiguration;

/// Integrated sensor resolution
pub const TICKS_PER_ROTATION: f64 = 2048.0;

/// Raw velocity is reported per 100 ms sampling window
pub const VELOCITY_WINDOWS_PER_SECOND: f64 = 10.0;

/// Multipliers from raw sensor units to physical units at the wheel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCoefficients {
    /// Meters per tick
    pub position: f64,
    /// (m/s) per (ticks / 100 ms)
    pub velocity: f64,
}

impl SensorCoefficients {
    pub fn from_module(module: &ModuleConfiguration) -> Self {
        let position =
            PI * module.wheel_diameter() * module.drive_reduction() / TICKS_PER_ROTATION;
        Self {
            position,
            velocity: position * VELOCITY_WINDOWS_PER_SECOND,
        }
    }

    pub fn position_meters(&self, raw_ticks: f64) -> f64 {
        raw_ticks * self.position
    }

    pub fn velocity_meters_per_second(&self, raw_ticks_per_window: f64) -> f64 {
        raw_ticks_per_window * self.velocity
    }
}
