// Runtime translation between physical units and device units

use super::conversion::SensorCoefficients;
use super::device::{CanPort, ControlMode, DeviceError, MotorDevice};
use super::error::{DriveError, Result};

/// Normalization voltage used when voltage compensation is not configured
pub const DEFAULT_NOMINAL_VOLTAGE: f64 = 12.0;

/// A configured drive motor, as seen by the swerve module
pub trait DriveController {
    /// Command the motor with a voltage in volts
    fn set_reference_voltage(&mut self, voltage: f64) -> Result<()>;

    /// Wheel linear velocity in m/s
    fn get_state_velocity(&mut self) -> Result<f64>;

    /// Wheel distance traveled in m
    fn get_state_position(&mut self) -> Result<f64>;
}

/// Drive controller bound to one motor device.
///
/// Every call goes to the device. Nothing is cached and failures are returned
/// as-is, so a stale or zero reading is never substituted.
#[derive(Debug)]
pub struct TalonDriveController<D> {
    device: D,
    port: CanPort,
    coefficients: SensorCoefficients,
    nominal_voltage: f64,
}

impl<D: MotorDevice> TalonDriveController<D> {
    pub(crate) fn new(
        device: D,
        port: CanPort,
        coefficients: SensorCoefficients,
        compensation_voltage: Option<f64>,
    ) -> Self {
        Self {
            device,
            port,
            coefficients,
            nominal_voltage: compensation_voltage.unwrap_or(DEFAULT_NOMINAL_VOLTAGE),
        }
    }

    pub fn nominal_voltage(&self) -> f64 {
        self.nominal_voltage
    }

    pub fn coefficients(&self) -> SensorCoefficients {
        self.coefficients
    }

    pub fn port(&self) -> &CanPort {
        &self.port
    }

    fn transport(&self, source: DeviceError) -> DriveError {
        DriveError::Transport {
            port: self.port.clone(),
            source,
        }
    }
}

impl<D: MotorDevice> DriveController for TalonDriveController<D> {
    fn set_reference_voltage(&mut self, voltage: f64) -> Result<()> {
        // Range limiting is left to the device
        let output = voltage / self.nominal_voltage;
        self.device
            .set(ControlMode::PercentOutput, output)
            .map_err(|e| self.transport(e))
    }

    fn get_state_velocity(&mut self) -> Result<f64> {
        let raw = self
            .device
            .selected_sensor_velocity()
            .map_err(|e| self.transport(e))?;
        Ok(self.coefficients.velocity_meters_per_second(raw))
    }

    fn get_state_position(&mut self) -> Result<f64> {
        let raw = self
            .device
            .selected_sensor_position()
            .map_err(|e| self.transport(e))?;
        Ok(self.coefficients.position_meters(raw))
    }
}

impl<C: DriveController + ?Sized> DriveController for Box<C> {
    fn set_reference_voltage(&mut self, voltage: f64) -> Result<()> {
        (**self).set_reference_voltage(voltage)
    }

    fn get_state_velocity(&mut self) -> Result<f64> {
        (**self).get_state_velocity()
    }

    fn get_state_position(&mut self) -> Result<f64> {
        (**self).get_state_position()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::drive::builder::DriveControllerFactoryBuilder;
    use crate::drive::factory::DriveControllerFactory;
    use crate::drive::geometry::ModuleConfiguration;
    use crate::drive::sim::SimBus;

    fn port() -> CanPort {
        CanPort::on_default_bus(1)
    }

    fn module() -> ModuleConfiguration {
        ModuleConfiguration::new(0.10, 1.0 / 6.75, false, 1.0 / 12.8, false)
    }

    fn controller(
        builder: &DriveControllerFactoryBuilder,
    ) -> (SimBus, TalonDriveController<crate::drive::sim::SimMotor>) {
        let bus = SimBus::new();
        bus.add_motor(port());
        let controller = builder.build(bus.clone()).create(port(), &module()).unwrap();
        (bus, controller)
    }

    #[test]
    fn test_compensated_voltage_normalization() {
        let mut builder = DriveControllerFactoryBuilder::new();
        builder.with_voltage_compensation(10.0).unwrap();
        let (bus, mut controller) = controller(&builder);

        assert_eq!(controller.nominal_voltage(), 10.0);
        controller.set_reference_voltage(5.0).unwrap();
        assert_eq!(bus.output(&port()), Some((ControlMode::PercentOutput, 0.5)));
    }

    #[test]
    fn test_default_nominal_voltage() {
        let (bus, mut controller) = controller(&DriveControllerFactoryBuilder::new());

        assert_eq!(controller.nominal_voltage(), DEFAULT_NOMINAL_VOLTAGE);
        controller.set_reference_voltage(6.0).unwrap();
        assert_eq!(bus.output(&port()), Some((ControlMode::PercentOutput, 0.5)));

        // Out-of-range commands are passed through unclamped
        controller.set_reference_voltage(-24.0).unwrap();
        assert_eq!(bus.output(&port()), Some((ControlMode::PercentOutput, -2.0)));
    }

    #[test]
    fn test_position_of_one_motor_revolution() {
        let (bus, mut controller) = controller(&DriveControllerFactoryBuilder::new());
        bus.set_raw_sensor(&port(), 2048.0, 0.0);

        let position = controller.get_state_position().unwrap();
        assert!((position - PI * 0.10 * (1.0 / 6.75)).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_reads_fresh_each_call() {
        let (bus, mut controller) = controller(&DriveControllerFactoryBuilder::new());

        bus.set_raw_sensor(&port(), 0.0, 1000.0);
        let first = controller.get_state_velocity().unwrap();
        assert!((first - 1000.0 * controller.coefficients().velocity).abs() < 1e-12);

        bus.set_raw_sensor(&port(), 0.0, -500.0);
        let second = controller.get_state_velocity().unwrap();
        assert!((second + 500.0 * controller.coefficients().velocity).abs() < 1e-12);
    }

    #[test]
    fn test_transport_errors_surface() {
        let (bus, mut controller) = controller(&DriveControllerFactoryBuilder::new());
        bus.fail_transport(&port(), true);

        assert!(matches!(
            controller.set_reference_voltage(3.0),
            Err(DriveError::Transport { .. })
        ));
        assert!(matches!(
            controller.get_state_velocity(),
            Err(DriveError::Transport { .. })
        ));
        assert!(matches!(
            controller.get_state_position(),
            Err(DriveError::Transport { ref port, .. }) if *port == CanPort::on_default_bus(1)
        ));

        bus.fail_transport(&port(), false);
        assert!(controller.get_state_position().is_ok());
    }

    #[test]
    fn test_boxed_controller() {
        let (bus, controller) = controller(&DriveControllerFactoryBuilder::new());
        let mut boxed: Box<dyn DriveController> = Box::new(controller);

        boxed.set_reference_voltage(12.0).unwrap();
        assert_eq!(bus.output(&port()), Some((ControlMode::PercentOutput, 1.0)));
    }
}
