// Drive motor control for one swerve module
//
// Provides:
// - Deferred-configuration builder producing a controller factory
// - One-time motor controller bring-up sequence
// - Sensor tick <-> wheel distance/speed conversion
// - Simulated motor controllers for running without hardware

mod builder;
mod controller;
pub mod conversion;
pub mod device;
mod error;
mod factory;
pub mod geometry;
pub mod sim;

pub use builder::{DriveConfiguration, DriveControllerFactoryBuilder};
pub use controller::{DriveController, TalonDriveController, DEFAULT_NOMINAL_VOLTAGE};
pub use conversion::SensorCoefficients;
pub use device::{CanPort, DeviceError, DeviceOpener, MotorDevice};
pub use error::{ConfigError, DriveError, InitStep, Result};
pub use factory::{
    DriveControllerFactory, DriveControllerFactoryImpl, CAN_TIMEOUT, STATUS_FRAME_GENERAL_PERIOD,
};
pub use geometry::{ModuleConfiguration, ModulePreset};
pub use sim::{SimBus, SimMotor};
