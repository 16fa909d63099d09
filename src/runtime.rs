// 50 Hz drive loop with watchdog
// If the module layer stops sending commands, the drive motor is commanded to 0 V
// and the brake neutral mode holds the wheel.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

// local imports
use crate::config::{
    topic_cmd_drive, topic_health, topic_rt_drive, RuntimeConfig, CMD_TIMEOUT, LOOP_HZ,
};
use crate::drive::{
    DriveController, DriveControllerFactory, DriveControllerFactoryBuilder, DriveError, SimBus,
};
use crate::messages::{DriveCommand, DriveState, RuntimeHealth};

pub struct Runtime<C> {
    controller: C,
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
}

impl<C: DriveController> Runtime<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: DriveCommand, now: Instant) {
        info!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = now;
    }

    /// Voltage to apply, based on watchdog state
    fn target_voltage(&mut self, now: Instant) -> f64 {
        let cmd_age = now.saturating_duration_since(self.cmd_received_at);

        match self.latest_cmd {
            Some(ref cmd) if cmd_age <= CMD_TIMEOUT => {
                self.health = RuntimeHealth::Ok;
                cmd.voltage
            }
            Some(_) => {
                // Watchdog triggered - stop driving
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Command stale ({:?} old), stopping drive motor", cmd_age);
                }
                self.health = RuntimeHealth::CmdStale;
                0.0
            }
            None => {
                // No command ever received
                self.health = RuntimeHealth::CmdStale;
                0.0
            }
        }
    }

    /// Apply the current command and read back the wheel state
    pub fn tick(&mut self, now: Instant) -> Result<DriveState, DriveError> {
        let voltage = self.target_voltage(now);

        let result = self.apply(voltage);
        if result.is_err() {
            self.health = RuntimeHealth::Fault;
        }
        result
    }

    fn apply(&mut self, voltage: f64) -> Result<DriveState, DriveError> {
        self.controller.set_reference_voltage(voltage)?;
        Ok(DriveState {
            velocity: self.controller.get_state_velocity()?,
            position: self.controller.get_state_position()?,
        })
    }
}

pub async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;
    if !config.simulate {
        return Err("no hardware motor transport is available, set \"simulate\": true".into());
    }

    let bus = SimBus::new();
    bus.add_motor(config.port.clone());

    let mut builder = DriveControllerFactoryBuilder::new();
    if let Some(voltage) = config.nominal_voltage {
        builder.with_voltage_compensation(voltage)?;
    }
    if let Some(limit) = config.current_limit {
        builder.with_current_limit(limit)?;
    }
    let factory = builder.build(bus.clone());
    let controller = factory.create(config.port.clone(), &config.geometry.module_configuration())?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    let topic_cmd = topic_cmd_drive(&config.module);
    let topic_rt = topic_rt_drive(&config.module);
    let topic_state = topic_health(&config.module);

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(topic_cmd.as_str()).await?;
    let pub_state = session.declare_publisher(topic_rt.as_str()).await?;
    let pub_health = session.declare_publisher(topic_state.as_str()).await?;

    let mut runtime = Runtime::new(controller);
    let period = Duration::from_millis(1000 / LOOP_HZ);
    let mut tick = interval(period);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}", topic_cmd);
    info!("Publishing to: {}, {}", topic_rt, topic_state);

    loop {
        tick.tick().await;
        let now = Instant::now();

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => {
                    runtime.on_command(cmd, now);
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Drive the motor (includes watchdog logic)
        bus.step(period);
        match runtime.tick(now) {
            Ok(state) => {
                // 3. Publish measured state
                let state_json = serde_json::to_string(&state)?;
                pub_state.put(state_json).await?;
            }
            Err(e) => {
                warn!("Drive motor fault: {}", e);
            }
        }

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}
