//! # RC Drive
//!
//! Drive a dual-motor RC vehicle with an Xbox-style gamepad on a Raspberry Pi.
//!
//! This application reads the gamepad through evdev and turns stick, trigger
//! and button input into ESC pulse widths, servo angles and host actions.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use rc_drive::actuator::gpio::GpioActuator;
use rc_drive::actuator::shared::SharedActuator;
use rc_drive::config::{Config, LoggingConfig};
use rc_drive::control::control_loop::{ControlLoop, LoopExit};
use rc_drive::controller::gamepad::Gamepad;
use rc_drive::controller::haptics::{EvdevHaptics, Haptics, NoHaptics};
use rc_drive::controller::mapper::ControllerLayout;
use rc_drive::host::{HostActions, SystemHost};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// How long Ctrl+C waits for in-flight work before the process exits
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Main entry point for RC Drive
///
/// Loads the configuration, sets up logging and supervises the control loop
/// until Ctrl+C or until the gamepad goes away.
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load `config/default.toml` (or the path given as first argument)
///    - Set up logging to stdout and, optionally, a daily log file
///
/// 2. **Session**
///    - Open the gamepad and read its axis ranges
///    - Claim the GPIO pins and enable rumble when supported
///    - Run the control loop on a blocking thread
///
/// 3. **Restart**
///    - Pressing `B` stops the motors, reloads the configuration and starts a
///      fresh session with neutral trim
///
/// 4. **Shutdown**
///    - Ctrl+C writes stop to both motors and locks the outputs
///    - Losing the gamepad stops the motors and ends the process
///
/// The runtime is shut down with a timeout: the control thread may be parked
/// in a device read that never returns.
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be read or is invalid
/// - No gamepad is found or its axis ranges are unusable
/// - The GPIO pins cannot be claimed
///
/// # Examples
///
/// Run the application:
/// ```bash
/// cargo run --release -- /etc/rc-drive/config.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO rc_drive: RC Drive v0.1.0 starting...
/// INFO rc_drive::controller::gamepad: Found gamepad "Microsoft X-Box 360 pad" at: /dev/input/event0
/// INFO rc_drive::controller::gamepad: Axis ranges: sticks -32768..32767, triggers 0..255
/// INFO rc_drive::control::control_loop: Control loop running
/// ```
fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&config_path)?;

    let _log_guard = init_logging(&config.logging);

    info!("RC Drive v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(supervise(config_path, config));
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);

    info!("RC Drive stopped");
    result
}

fn load_config(path: &str) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load configuration from {}", path))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must live until
/// the end of `main`.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = if config.directory.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Runs sessions back to back until Ctrl+C or the input stream ends.
async fn supervise(config_path: String, mut config: Config) -> Result<()> {
    info!("Press Ctrl+C to exit");

    loop {
        // Pins are released once both handles drop at the end of the session
        let outputs = SharedActuator::new(GpioActuator::open(&config)?);

        let session = tokio::task::spawn_blocking({
            let config = config.clone();
            let outputs = outputs.clone();
            let runtime = Handle::current();
            move || run_session(&config, outputs, runtime)
        });

        tokio::select! {
            joined = session => {
                match joined.context("Control thread panicked")?? {
                    LoopExit::Restart => {
                        info!("Restarting control loop");
                        match load_config(&config_path) {
                            Ok(reloaded) => config = reloaded,
                            Err(e) => warn!("{:#}, keeping previous configuration", e),
                        }
                    }
                    LoopExit::StreamEnded => {
                        warn!("Gamepad disconnected, shutting down");
                        return Ok(());
                    }
                }
            }

            // Handle Ctrl+C
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                if let Err(e) = outputs.halt(stop_pulse_widths(&config)) {
                    warn!("Failed to stop motors: {}", e);
                }
                return Ok(());
            }
        }
    }
}

/// Builds the full control stack and runs it until it exits.
fn run_session(
    config: &Config,
    outputs: SharedActuator<GpioActuator>,
    runtime: Handle,
) -> Result<LoopExit> {
    let gamepad = Gamepad::open(&config.controller.device_path, ControllerLayout::default())?;
    let caps = gamepad.capabilities()?;

    let haptics: Arc<dyn Haptics> =
        match EvdevHaptics::open(gamepad.device_path(), config.controller.rumble_strength) {
            Ok(haptics) => Arc::new(haptics),
            Err(e) => {
                warn!("Rumble disabled: {}", e);
                Arc::new(NoHaptics)
            }
        };
    let host: Arc<dyn HostActions> = Arc::new(SystemHost::new(&config.host));

    let mut control = ControlLoop::new(config, caps, outputs, haptics, host, runtime)?;
    Ok(control.run(gamepad.into_events()))
}

/// `[left, right]` stop pulse widths.
fn stop_pulse_widths(config: &Config) -> [u16; 2] {
    [config.motors.left.stop_pw, config.motors.right.stop_pw]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_reports_path() {
        let err = load_config("/nonexistent/rc-drive.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/rc-drive.toml"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[hold]\nthreshold_ms = 1500").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.hold.threshold_ms, 1500);
    }

    #[test]
    fn test_stop_pulse_widths_follow_config() {
        let mut config = Config::default();
        config.motors.right.stop_pw = 1520;
        assert_eq!(stop_pulse_widths(&config), [1500, 1520]);
    }

    #[test]
    fn test_shutdown_timeout_is_short() {
        // Ctrl+C must not wait noticeably for a blocked device read
        assert!(SHUTDOWN_TIMEOUT <= Duration::from_secs(1));
    }
}
