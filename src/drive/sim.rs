// In-process simulated motor controllers
//
// `SimBus` plays the role of the CAN network: it owns the state of every
// simulated motor and hands out `SimMotor` handles that share it. Each handle
// records the calls made on it so bring-up sequences can be inspected.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use super::device::{
    CanPort, ControlMode, DeviceConfiguration, DeviceError, DeviceOpener, InvertType,
    MotorDevice, NeutralMode, StatusFrame,
};

/// Free speed in raw velocity units (6380 rpm at 2048 ticks/rev, per 100 ms)
pub const FREE_SPEED_TICKS_PER_WINDOW: f64 = 6380.0 / 60.0 * 2048.0 / 10.0;

/// Time constant of the spin-down of a coasting motor
pub const COAST_TIME_CONSTANT: Duration = Duration::from_millis(500);

/// Most recent calls kept per motor; older ones are dropped
pub const MAX_RECORDED_CALLS: usize = 256;

/// A call received by a simulated motor
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    ConfigureAll {
        config: DeviceConfiguration,
        timeout: Duration,
    },
    EnableVoltageCompensation(bool),
    SetNeutralMode(NeutralMode),
    SetInverted(InvertType),
    SetSensorPhase(bool),
    SetStatusFramePeriod {
        frame: StatusFrame,
        period: Duration,
        timeout: Duration,
    },
    Set(ControlMode, f64),
    ReadVelocity,
    ReadPosition,
}

#[derive(Debug)]
struct MotorState {
    calls: VecDeque<DeviceCall>,
    call_count: usize,
    unresponsive: bool,
    fail_transport: bool,
    reject_after: Option<usize>,
    config: DeviceConfiguration,
    neutral_mode: NeutralMode,
    inverted: InvertType,
    sensor_phase: bool,
    output: Option<(ControlMode, f64)>,
    /// Counter-clockwise positive, raw velocity units
    shaft_velocity: f64,
    raw_position: f64,
    raw_velocity: f64,
}

// Power-on state of a controller
impl Default for MotorState {
    fn default() -> Self {
        Self {
            calls: VecDeque::new(),
            call_count: 0,
            unresponsive: false,
            fail_transport: false,
            reject_after: None,
            config: DeviceConfiguration::default(),
            neutral_mode: NeutralMode::Coast,
            inverted: InvertType::CounterClockwise,
            sensor_phase: true,
            output: None,
            shaft_velocity: 0.0,
            raw_position: 0.0,
            raw_velocity: 0.0,
        }
    }
}

impl MotorState {
    /// +1 when positive output turns the shaft counter-clockwise
    fn output_sense(&self) -> f64 {
        match self.inverted {
            InvertType::CounterClockwise => 1.0,
            InvertType::Clockwise => -1.0,
        }
    }

    /// +1 when the sensor counts up for positive output
    fn sensor_sense(&self) -> f64 {
        if self.sensor_phase { 1.0 } else { -1.0 }
    }
}

type Motors = HashMap<CanPort, MotorState>;

/// Simulated bus holding every registered motor
#[derive(Debug, Clone, Default)]
pub struct SimBus {
    motors: Arc<Mutex<Motors>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Motors> {
        // State is plain data, a poisoned lock is still consistent
        self.motors.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a responsive motor at `port`
    pub fn add_motor(&self, port: CanPort) {
        self.lock().insert(port, MotorState::default());
    }

    /// Register a motor that never acknowledges configuration
    pub fn add_unresponsive_motor(&self, port: CanPort) {
        self.lock().insert(
            port,
            MotorState {
                unresponsive: true,
                ..MotorState::default()
            },
        );
    }

    /// Make runtime commands and reads on `port` fail
    pub fn fail_transport(&self, port: &CanPort, fail: bool) {
        if let Some(motor) = self.lock().get_mut(port) {
            motor.fail_transport = fail;
        }
    }

    /// Let the first `count` calls succeed, then reject every later one
    pub fn reject_after(&self, port: &CanPort, count: usize) {
        if let Some(motor) = self.lock().get_mut(port) {
            motor.reject_after = Some(count);
        }
    }

    /// Overwrite the raw sensor readings of `port`
    pub fn set_raw_sensor(&self, port: &CanPort, position: f64, velocity: f64) {
        if let Some(motor) = self.lock().get_mut(port) {
            motor.raw_position = position;
            motor.raw_velocity = velocity;
        }
    }

    /// Recorded calls of `port`, oldest first, at most [`MAX_RECORDED_CALLS`]
    pub fn calls(&self, port: &CanPort) -> Vec<DeviceCall> {
        self.lock()
            .get(port)
            .map(|motor| motor.calls.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Shaft speed of `port` in raw velocity units, counter-clockwise positive
    pub fn shaft_velocity(&self, port: &CanPort) -> Option<f64> {
        self.lock().get(port).map(|motor| motor.shaft_velocity)
    }

    /// Settings last accepted by `configure_all` on `port`
    pub fn configuration(&self, port: &CanPort) -> Option<DeviceConfiguration> {
        self.lock().get(port).map(|motor| motor.config)
    }

    /// Last commanded output of `port`
    pub fn output(&self, port: &CanPort) -> Option<(ControlMode, f64)> {
        self.lock().get(port).and_then(|motor| motor.output)
    }

    /// Advance every motor by `dt`.
    ///
    /// A driven motor runs at output x free speed. At zero output a braked
    /// motor stops at once and a coasting one spins down exponentially.
    pub fn step(&self, dt: Duration) {
        for motor in self.lock().values_mut() {
            let demand = match motor.output {
                Some((ControlMode::PercentOutput, value)) => value.clamp(-1.0, 1.0),
                None => 0.0,
            };

            motor.shaft_velocity = if demand != 0.0 {
                demand * motor.output_sense() * FREE_SPEED_TICKS_PER_WINDOW
            } else {
                match motor.neutral_mode {
                    NeutralMode::Brake => 0.0,
                    NeutralMode::Coast => {
                        let decay = (-dt.as_secs_f64() / COAST_TIME_CONSTANT.as_secs_f64()).exp();
                        motor.shaft_velocity * decay
                    }
                }
            };

            // Integrated sensor counts in the output frame
            motor.raw_velocity = motor.shaft_velocity * motor.output_sense() * motor.sensor_sense();
            motor.raw_position += motor.raw_velocity * 10.0 * dt.as_secs_f64();
        }
    }
}

impl DeviceOpener for SimBus {
    type Device = SimMotor;

    fn open(&self, port: &CanPort) -> Result<SimMotor, DeviceError> {
        if !self.lock().contains_key(port) {
            return Err(DeviceError::NotFound { port: port.clone() });
        }
        debug!("Opened simulated motor {}", port);
        Ok(SimMotor {
            port: port.clone(),
            motors: Arc::clone(&self.motors),
        })
    }
}

/// Handle to one simulated motor
#[derive(Debug)]
pub struct SimMotor {
    port: CanPort,
    motors: Arc<Mutex<Motors>>,
}

impl SimMotor {
    /// Record `call` and run `f` on the motor state unless the call is refused
    fn with_state<T>(
        &mut self,
        call: DeviceCall,
        f: impl FnOnce(&mut MotorState) -> T,
    ) -> Result<T, DeviceError> {
        let id = self.port.id;
        let mut motors = self.motors.lock().unwrap_or_else(|e| e.into_inner());
        let motor = motors
            .get_mut(&self.port)
            .ok_or_else(|| DeviceError::NotFound {
                port: self.port.clone(),
            })?;

        let runtime_call = matches!(
            call,
            DeviceCall::Set(..) | DeviceCall::ReadVelocity | DeviceCall::ReadPosition
        );
        let index = motor.call_count;
        motor.call_count += 1;
        if motor.calls.len() == MAX_RECORDED_CALLS {
            motor.calls.pop_front();
        }
        motor.calls.push_back(call);

        if runtime_call && motor.fail_transport {
            return Err(DeviceError::Timeout { id });
        }
        if motor.reject_after.is_some_and(|count| index >= count) {
            return Err(DeviceError::Rejected { id, code: -1 });
        }
        Ok(f(motor))
    }
}

impl MotorDevice for SimMotor {
    fn configure_all(
        &mut self,
        config: &DeviceConfiguration,
        timeout: Duration,
    ) -> Result<(), DeviceError> {
        let unresponsive = self.with_state(
            DeviceCall::ConfigureAll {
                config: *config,
                timeout,
            },
            |motor| {
                if !motor.unresponsive {
                    motor.config = *config;
                }
                motor.unresponsive
            },
        )?;

        if unresponsive {
            // Wait out the request like a real bus would, without holding the lock
            std::thread::sleep(timeout);
            return Err(DeviceError::Timeout { id: self.port.id });
        }
        Ok(())
    }

    fn enable_voltage_compensation(&mut self, enable: bool) -> Result<(), DeviceError> {
        self.with_state(DeviceCall::EnableVoltageCompensation(enable), |_| ())
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result<(), DeviceError> {
        self.with_state(DeviceCall::SetNeutralMode(mode), |motor| {
            motor.neutral_mode = mode
        })
    }

    fn set_inverted(&mut self, invert: InvertType) -> Result<(), DeviceError> {
        self.with_state(DeviceCall::SetInverted(invert), |motor| {
            motor.inverted = invert
        })
    }

    fn set_sensor_phase(&mut self, phase: bool) -> Result<(), DeviceError> {
        self.with_state(DeviceCall::SetSensorPhase(phase), |motor| {
            motor.sensor_phase = phase
        })
    }

    fn set_status_frame_period(
        &mut self,
        frame: StatusFrame,
        period: Duration,
        timeout: Duration,
    ) -> Result<(), DeviceError> {
        self.with_state(
            DeviceCall::SetStatusFramePeriod {
                frame,
                period,
                timeout,
            },
            |_| (),
        )
    }

    fn set(&mut self, mode: ControlMode, value: f64) -> Result<(), DeviceError> {
        self.with_state(DeviceCall::Set(mode, value), |motor| {
            motor.output = Some((mode, value))
        })
    }

    fn selected_sensor_velocity(&mut self) -> Result<f64, DeviceError> {
        self.with_state(DeviceCall::ReadVelocity, |motor| motor.raw_velocity)
    }

    fn selected_sensor_position(&mut self) -> Result<f64, DeviceError> {
        self.with_state(DeviceCall::ReadPosition, |motor| motor.raw_position)
    }
}
