// Keyboard drive command publisher: W/S drive, R/F voltage step, Q quit
//
// Usage: cargo run --example cmd_publisher -- [module]
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use swerve_drive_runtime::config::topic_cmd_drive;
use swerve_drive_runtime::messages::DriveCommand;

const VOLTAGES: [f64; 3] = [2.0, 6.0, 10.0]; // volts
const INPUT_TIMEOUT_MS: u64 = 100; // Drop to 0 V after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let module = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "front_left".to_string());
    let topic = topic_cmd_drive(&module);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(topic.as_str()).await?;

    info!("Publishing to {}", topic);
    info!("Controls: W/S=drive, R/F=voltage step, Q=quit");
    print_step(0);

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut step_idx: usize = 0;
    let mut voltage = 0.0;
    let mut last_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        voltage = VOLTAGES[step_idx];
                        last_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        voltage = -VOLTAGES[step_idx];
                        last_input = Instant::now();
                    }

                    KeyCode::Char('r') if pressed => {
                        step_idx = (step_idx + 1).min(VOLTAGES.len() - 1);
                        print_step(step_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        step_idx = step_idx.saturating_sub(1);
                        print_step(step_idx);
                    }

                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            voltage = 0.0;
        }

        // Always publish at ~50Hz
        let cmd = serde_json::to_string(&DriveCommand { voltage })?;
        publisher.put(cmd).await?;
    }

    Ok(())
}

fn print_step(idx: usize) {
    info!("Voltage step: {} V", VOLTAGES[idx]);
}
