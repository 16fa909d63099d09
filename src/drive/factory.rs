// One-time drive motor bring-up
//
// Step order matters to the device: the saturation voltage must be written by
// `configure_all` before compensation is enabled, and inversion is set before
// sensor phase.

use std::time::Duration;

use tracing::{debug, info};

use super::builder::DriveConfiguration;
use super::controller::TalonDriveController;
use super::conversion::SensorCoefficients;
use super::device::{
    CanPort, DeviceConfiguration, DeviceError, DeviceOpener, InvertType, MotorDevice,
    NeutralMode, StatusFrame, SupplyCurrentLimit,
};
use super::error::{DriveError, InitStep, Result};
use super::geometry::ModuleConfiguration;

/// Timeout for each configuration request
pub const CAN_TIMEOUT: Duration = Duration::from_millis(250);

/// Broadcast period of the general status frame
pub const STATUS_FRAME_GENERAL_PERIOD: Duration = Duration::from_millis(250);

/// Creates drive controllers bound to a port and module geometry
pub trait DriveControllerFactory<C, P> {
    fn create(&self, port: P, module: &ModuleConfiguration) -> Result<C>;
}

/// Factory produced by [`DriveControllerFactoryBuilder::build`](super::DriveControllerFactoryBuilder::build)
#[derive(Debug, Clone)]
pub struct DriveControllerFactoryImpl<O> {
    config: DriveConfiguration,
    opener: O,
}

impl<O: DeviceOpener> DriveControllerFactoryImpl<O> {
    pub(crate) fn new(config: DriveConfiguration, opener: O) -> Self {
        Self { config, opener }
    }

    /// Configuration captured when this factory was built
    pub fn configuration(&self) -> DriveConfiguration {
        self.config
    }

    fn device_configuration(&self) -> DeviceConfiguration {
        DeviceConfiguration {
            voltage_comp_saturation: self.config.nominal_voltage,
            supply_current_limit: self.config.current_limit.map(|current_limit| {
                SupplyCurrentLimit {
                    enable: true,
                    current_limit,
                }
            }),
        }
    }

    fn bring_up(
        &self,
        device: &mut O::Device,
        module: &ModuleConfiguration,
        descriptor: &DeviceConfiguration,
    ) -> std::result::Result<(), (InitStep, DeviceError)> {
        debug!("Applying {:?}", descriptor);
        device
            .configure_all(descriptor, CAN_TIMEOUT)
            .map_err(|e| (InitStep::ConfigureAll, e))?;

        if self.config.nominal_voltage.is_some() {
            device
                .enable_voltage_compensation(true)
                .map_err(|e| (InitStep::VoltageCompensation, e))?;
        }

        device
            .set_neutral_mode(NeutralMode::Brake)
            .map_err(|e| (InitStep::NeutralMode, e))?;

        let invert = if module.is_drive_inverted() {
            InvertType::Clockwise
        } else {
            InvertType::CounterClockwise
        };
        debug!("Setting inversion {:?}", invert);
        device
            .set_inverted(invert)
            .map_err(|e| (InitStep::Inversion, e))?;
        device
            .set_sensor_phase(true)
            .map_err(|e| (InitStep::SensorPhase, e))?;

        // Reduce CAN bus load
        device
            .set_status_frame_period(StatusFrame::General, STATUS_FRAME_GENERAL_PERIOD, CAN_TIMEOUT)
            .map_err(|e| (InitStep::StatusFramePeriod, e))?;

        Ok(())
    }
}

impl<O: DeviceOpener> DriveControllerFactory<TalonDriveController<O::Device>, CanPort>
    for DriveControllerFactoryImpl<O>
{
    fn create(
        &self,
        port: CanPort,
        module: &ModuleConfiguration,
    ) -> Result<TalonDriveController<O::Device>> {
        info!("Configuring drive motor {}", port);

        let coefficients = SensorCoefficients::from_module(module);
        let descriptor = self.device_configuration();

        let mut device = self
            .opener
            .open(&port)
            .map_err(|source| DriveError::DeviceInitialization {
                port: port.clone(),
                step: InitStep::Open,
                source,
            })?;

        if let Err((step, source)) = self.bring_up(&mut device, module, &descriptor) {
            return Err(DriveError::DeviceInitialization { port, step, source });
        }

        info!(
            "Drive motor {} ready (position coefficient {:.3e} m/tick)",
            port, coefficients.position
        );
        Ok(TalonDriveController::new(
            device,
            port,
            coefficients,
            self.config.nominal_voltage,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;
    use std::time::Instant;

    use super::*;
    use crate::drive::builder::DriveControllerFactoryBuilder;
    use crate::drive::controller::DriveController;
    use crate::drive::device::ControlMode;
    use crate::drive::geometry::{MK4_L1, MK4_L2};
    use crate::drive::sim::{DeviceCall, SimBus};

    fn port(id: u8) -> CanPort {
        CanPort::new(id, "canivore")
    }

    #[test]
    fn test_bring_up_order_with_all_options() {
        let bus = SimBus::new();
        bus.add_motor(port(1));

        let mut builder = DriveControllerFactoryBuilder::new();
        builder
            .with_voltage_compensation(12.0)
            .unwrap()
            .with_current_limit(80.0)
            .unwrap();
        let factory = builder.build(bus.clone());
        factory.create(port(1), &MK4_L2).unwrap();

        assert_eq!(
            bus.calls(&port(1)),
            vec![
                DeviceCall::ConfigureAll {
                    config: DeviceConfiguration {
                        voltage_comp_saturation: Some(12.0),
                        supply_current_limit: Some(SupplyCurrentLimit {
                            enable: true,
                            current_limit: 80.0,
                        }),
                    },
                    timeout: CAN_TIMEOUT,
                },
                DeviceCall::EnableVoltageCompensation(true),
                DeviceCall::SetNeutralMode(NeutralMode::Brake),
                DeviceCall::SetInverted(InvertType::Clockwise),
                DeviceCall::SetSensorPhase(true),
                DeviceCall::SetStatusFramePeriod {
                    frame: StatusFrame::General,
                    period: Duration::from_millis(250),
                    timeout: Duration::from_millis(250),
                },
            ]
        );
    }

    #[test]
    fn test_unset_options_leave_defaults() {
        let bus = SimBus::new();
        bus.add_motor(port(2));

        let factory = DriveControllerFactoryBuilder::new().build(bus.clone());
        let module = ModuleConfiguration::new(0.1, 0.15, false, 0.1, false);
        factory.create(port(2), &module).unwrap();

        let calls = bus.calls(&port(2));
        assert_eq!(
            calls[0],
            DeviceCall::ConfigureAll {
                config: DeviceConfiguration::default(),
                timeout: CAN_TIMEOUT,
            }
        );
        assert!(!calls.contains(&DeviceCall::EnableVoltageCompensation(true)));
        assert!(calls.contains(&DeviceCall::SetNeutralMode(NeutralMode::Brake)));
        assert!(calls.contains(&DeviceCall::SetInverted(InvertType::CounterClockwise)));
    }

    #[test]
    fn test_unknown_port_fails_to_open() {
        let bus = SimBus::new();
        let factory = DriveControllerFactoryBuilder::new().build(bus);

        match factory.create(port(9), &MK4_L1) {
            Err(DriveError::DeviceInitialization { step, source, .. }) => {
                assert_eq!(step, InitStep::Open);
                assert_eq!(source, DeviceError::NotFound { port: port(9) });
            }
            other => panic!("expected open failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unresponsive_device_times_out() {
        let bus = SimBus::new();
        bus.add_unresponsive_motor(port(3));
        let factory = DriveControllerFactoryBuilder::new().build(bus.clone());

        let start = Instant::now();
        let result = factory.create(port(3), &MK4_L1);
        let elapsed = start.elapsed();

        match result {
            Err(DriveError::DeviceInitialization { step, source, .. }) => {
                assert_eq!(step, InitStep::ConfigureAll);
                assert_eq!(source, DeviceError::Timeout { id: 3 });
            }
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
        assert!(elapsed >= CAN_TIMEOUT, "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "hung for {:?}", elapsed);

        // Nothing past the failed step was attempted
        assert_eq!(bus.calls(&port(3)).len(), 1);
    }

    #[test]
    fn test_builder_mutation_does_not_leak_into_built_factory() {
        let bus = SimBus::new();
        bus.add_motor(port(4));

        let mut builder = DriveControllerFactoryBuilder::new();
        builder.with_voltage_compensation(10.0).unwrap();
        let factory = builder.build(bus.clone());
        builder.with_voltage_compensation(6.0).unwrap();
        builder.with_current_limit(40.0).unwrap();

        assert_eq!(factory.configuration().nominal_voltage, Some(10.0));
        assert_eq!(factory.configuration().current_limit, None);

        let mut controller = factory.create(port(4), &MK4_L1).unwrap();
        controller.set_reference_voltage(5.0).unwrap();
        assert_eq!(bus.output(&port(4)), Some((ControlMode::PercentOutput, 0.5)));
    }

    #[test]
    fn test_two_factories_are_independent() {
        let bus = SimBus::new();
        for id in 5..=7 {
            bus.add_motor(port(id));
        }

        let builder = DriveControllerFactoryBuilder::new();
        let first = builder.build(bus.clone());
        let second = builder.build(bus.clone());

        let a = first.create(port(5), &MK4_L1).unwrap();
        let b = second.create(port(6), &MK4_L2).unwrap();
        let c = second.create(port(7), &MK4_L1).unwrap();

        assert_ne!(a.coefficients(), b.coefficients());
        assert_eq!(a.coefficients(), c.coefficients());
        assert_eq!(
            b.coefficients().position,
            PI * MK4_L2.wheel_diameter() * MK4_L2.drive_reduction() / 2048.0
        );
    }

    #[test]
    fn test_closure_opener() {
        let bus = SimBus::new();
        bus.add_motor(port(8));
        let shared = bus.clone();

        let factory = DriveControllerFactoryBuilder::new().build(move |p: &CanPort| shared.open(p));
        let controller = factory.create(port(8), &MK4_L1).unwrap();
        assert_eq!(controller.port(), &port(8));
        assert_eq!(bus.calls(&port(8)).len(), 5);
    }

    #[test]
    fn test_rejected_step_is_reported() {
        let bus = SimBus::new();
        bus.add_motor(port(10));
        bus.reject_after(&port(10), 2);

        let factory = DriveControllerFactoryBuilder::new().build(bus);
        match factory.create(port(10), &MK4_L1) {
            Err(DriveError::DeviceInitialization { step, .. }) => {
                assert_eq!(step, InitStep::Inversion);
            }
            other => panic!("expected rejection, got {:?}", other.map(|_| ())),
        }
    }
}
