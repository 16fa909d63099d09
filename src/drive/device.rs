// Motor controller device contract
//
// The drive pipeline never talks to a bus directly. It sees a capability-typed
// handle (`MotorDevice`) bound by a `DeviceOpener` from a `CanPort` address.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Address of a motor controller on a CAN network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanPort {
    pub id: u8,
    /// Empty string selects the default bus
    #[serde(default)]
    pub bus_name: String,
}

impl CanPort {
    pub fn new(id: u8, bus_name: impl Into<String>) -> Self {
        Self {
            id,
            bus_name: bus_name.into(),
        }
    }

    /// Port on the default bus
    pub fn on_default_bus(id: u8) -> Self {
        Self::new(id, "")
    }
}

impl fmt::Display for CanPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bus = if self.bus_name.is_empty() {
            "default"
        } else {
            &self.bus_name
        };
        write!(f, "{}:{}", bus, self.id)
    }
}

/// Output command modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMode {
    /// Fraction of available output, nominally [-1, 1]
    PercentOutput,
}

/// Shaft behavior at zero output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeutralMode {
    Coast,
    Brake,
}

/// Positive output rotation sense, viewed from the shaft end
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvertType {
    Clockwise,
    CounterClockwise,
}

/// Periodic telemetry frames broadcast by the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusFrame {
    /// Applied output, faults and limit switches
    General,
}

/// Supply-side current limiting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupplyCurrentLimit {
    pub enable: bool,
    pub current_limit: f64,
}

/// Settings applied in one `configure_all` call.
///
/// `None` fields are not written, so the device keeps its own default.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceConfiguration {
    pub voltage_comp_saturation: Option<f64>,
    pub supply_current_limit: Option<SupplyCurrentLimit>,
}

/// Transport-level failures reported by a device handle
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("Timeout waiting for response from device {id}")]
    Timeout { id: u8 },

    #[error("Device {id} rejected request with code {code}")]
    Rejected { id: u8, code: i32 },

    #[error("No device found at {port}")]
    NotFound { port: CanPort },
}

/// Operations a drive motor controller exposes
pub trait MotorDevice {
    /// Apply every setting in `config` atomically
    fn configure_all(
        &mut self,
        config: &DeviceConfiguration,
        timeout: Duration,
    ) -> Result<(), DeviceError>;

    /// Only takes effect for a saturation voltage already written by `configure_all`
    fn enable_voltage_compensation(&mut self, enable: bool) -> Result<(), DeviceError>;

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result<(), DeviceError>;

    fn set_inverted(&mut self, invert: InvertType) -> Result<(), DeviceError>;

    /// `true` keeps the sensor in phase with the motor output
    fn set_sensor_phase(&mut self, phase: bool) -> Result<(), DeviceError>;

    fn set_status_frame_period(
        &mut self,
        frame: StatusFrame,
        period: Duration,
        timeout: Duration,
    ) -> Result<(), DeviceError>;

    fn set(&mut self, mode: ControlMode, value: f64) -> Result<(), DeviceError>;

    /// Raw sensor velocity in ticks per 100 ms
    fn selected_sensor_velocity(&mut self) -> Result<f64, DeviceError>;

    /// Raw accumulated sensor position in ticks
    fn selected_sensor_position(&mut self) -> Result<f64, DeviceError>;
}

/// Binds a device handle to an address
pub trait DeviceOpener {
    type Device: MotorDevice;

    fn open(&self, port: &CanPort) -> Result<Self::Device, DeviceError>;
}

impl<F, D> DeviceOpener for F
where
    F: Fn(&CanPort) -> Result<D, DeviceError>,
    D: MotorDevice,
{
    type Device = D;

    fn open(&self, port: &CanPort) -> Result<D, DeviceError> {
        self(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_display() {
        assert_eq!(CanPort::new(3, "canivore").to_string(), "canivore:3");
        assert_eq!(CanPort::on_default_bus(7).to_string(), "default:7");
    }

    #[test]
    fn test_empty_configuration_writes_nothing() {
        let config = DeviceConfiguration::default();
        assert!(config.voltage_comp_saturation.is_none());
        assert!(config.supply_current_limit.is_none());
    }

    #[test]
    fn test_port_deserialize_defaults_bus() {
        let port: CanPort = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(port, CanPort::on_default_bus(4));
    }
}
