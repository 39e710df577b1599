//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values fall back to the
//! reference vehicle (ESCs at 1200-1800 µs with 1500 µs stop, 0-180° servos
//! centred at 90°, 2 s long-press).

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{RcDriveError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub motors: MotorsConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub hold: HoldConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Event device path. Empty means auto-detect.
    #[serde(default)]
    pub device_path: String,

    /// Stick Y axes report "up" as negative; invert so up drives forward.
    #[serde(default = "default_invert_drive_axes")]
    pub invert_drive_axes: bool,

    #[serde(default = "default_rumble_ms")]
    pub rumble_ms: u16,

    #[serde(default = "default_rumble_strength")]
    pub rumble_strength: u16,
}

/// Drive motor (ESC) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MotorsConfig {
    #[serde(default = "default_left_motor")]
    pub left: MotorConfig,

    #[serde(default = "default_right_motor")]
    pub right: MotorConfig,

    /// Share of each side's span around `stop_pw` that snaps to stop.
    /// The default gives ±50 µs on a 1200/1500/1800 ESC.
    #[serde(default = "default_dead_zone_fraction")]
    pub dead_zone_fraction: f32,
}

/// One ESC output
#[derive(Debug, Deserialize, Clone)]
pub struct MotorConfig {
    pub gpio: u8,

    #[serde(default = "default_stop_pw")]
    pub stop_pw: u16,

    #[serde(default = "default_min_pw")]
    pub min_pw: u16,

    #[serde(default = "default_max_pw")]
    pub max_pw: u16,
}

/// Steering servo configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SteeringConfig {
    #[serde(default = "default_front_servo")]
    pub front: ServoConfig,

    #[serde(default = "default_rear_servo")]
    pub rear: ServoConfig,
}

/// One steering servo output
#[derive(Debug, Deserialize, Clone)]
pub struct ServoConfig {
    pub gpio: u8,

    #[serde(default = "default_min_deg")]
    pub min_deg: f32,

    #[serde(default = "default_max_deg")]
    pub max_deg: f32,

    /// Neutral angle before any trim is stored.
    #[serde(default = "default_start_deg")]
    pub start_deg: f32,

    /// Swing either side of neutral at full stick deflection.
    #[serde(default = "default_half_range")]
    pub half_range: f32,

    /// Counter-steer: full right stick drives this servo left.
    #[serde(default)]
    pub reversed: bool,
}

/// Long-press gesture configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HoldConfig {
    #[serde(default = "default_hold_threshold_ms")]
    pub threshold_ms: u64,
}

/// Host command configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HostConfig {
    #[serde(default = "default_reboot_command")]
    pub reboot_command: Vec<String>,

    #[serde(default = "default_shutdown_command")]
    pub shutdown_command: Vec<String>,
}

/// PWM output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ActuatorConfig {
    #[serde(default = "default_pwm_frequency_hz")]
    pub pwm_frequency_hz: f64,

    #[serde(default = "default_servo_min_pulse_us")]
    pub servo_min_pulse_us: u16,

    #[serde(default = "default_servo_max_pulse_us")]
    pub servo_max_pulse_us: u16,

    /// Mechanical travel covered by `servo_min_pulse_us..servo_max_pulse_us`.
    #[serde(default = "default_servo_range_deg")]
    pub servo_range_deg: f32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files. Empty disables file logging.
    #[serde(default)]
    pub directory: String,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

// Default value functions
fn default_invert_drive_axes() -> bool { true }
fn default_rumble_ms() -> u16 { 200 }
fn default_rumble_strength() -> u16 { 0xc000 }

fn default_left_motor() -> MotorConfig {
    MotorConfig { gpio: 10, stop_pw: default_stop_pw(), min_pw: default_min_pw(), max_pw: default_max_pw() }
}
fn default_right_motor() -> MotorConfig {
    MotorConfig { gpio: 24, stop_pw: default_stop_pw(), min_pw: default_min_pw(), max_pw: default_max_pw() }
}
fn default_stop_pw() -> u16 { 1500 }
fn default_min_pw() -> u16 { 1200 }
fn default_max_pw() -> u16 { 1800 }
fn default_dead_zone_fraction() -> f32 { 50.0 / 300.0 }

fn default_front_servo() -> ServoConfig {
    ServoConfig {
        gpio: 18,
        min_deg: default_min_deg(),
        max_deg: default_max_deg(),
        start_deg: default_start_deg(),
        half_range: default_half_range(),
        reversed: false,
    }
}
fn default_rear_servo() -> ServoConfig {
    ServoConfig { gpio: 27, reversed: true, ..default_front_servo() }
}
fn default_min_deg() -> f32 { 0.0 }
fn default_max_deg() -> f32 { 180.0 }
fn default_start_deg() -> f32 { 90.0 }
fn default_half_range() -> f32 { 90.0 }

fn default_hold_threshold_ms() -> u64 { 2000 }

fn default_reboot_command() -> Vec<String> { vec!["sudo".into(), "reboot".into()] }
fn default_shutdown_command() -> Vec<String> {
    vec!["sudo".into(), "shutdown".into(), "-h".into(), "now".into()]
}

fn default_pwm_frequency_hz() -> f64 { 50.0 }
fn default_servo_min_pulse_us() -> u16 { 500 }
fn default_servo_max_pulse_us() -> u16 { 2500 }
fn default_servo_range_deg() -> f32 { 180.0 }

fn default_log_file_prefix() -> String { "rc-drive.log".to_string() }

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            invert_drive_axes: default_invert_drive_axes(),
            rumble_ms: default_rumble_ms(),
            rumble_strength: default_rumble_strength(),
        }
    }
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            left: default_left_motor(),
            right: default_right_motor(),
            dead_zone_fraction: default_dead_zone_fraction(),
        }
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self { front: default_front_servo(), rear: default_rear_servo() }
    }
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self { threshold_ms: default_hold_threshold_ms() }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            reboot_command: default_reboot_command(),
            shutdown_command: default_shutdown_command(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: default_pwm_frequency_hz(),
            servo_min_pulse_us: default_servo_min_pulse_us(),
            servo_max_pulse_us: default_servo_max_pulse_us(),
            servo_range_deg: default_servo_range_deg(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { directory: String::new(), file_prefix: default_log_file_prefix() }
    }
}

impl ActuatorConfig {
    /// PWM period in microseconds.
    #[must_use]
    pub fn period_us(&self) -> f64 {
        1_000_000.0 / self.pwm_frequency_hz
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_drive::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let period_us = self.actuator.period_us();

        // Validate PWM output
        if !(self.actuator.pwm_frequency_hz > 0.0 && self.actuator.pwm_frequency_hz <= 500.0) {
            return Err(RcDriveError::invalid_config(
                "pwm_frequency_hz must be greater than 0 and at most 500",
            ));
        }

        if self.actuator.servo_min_pulse_us >= self.actuator.servo_max_pulse_us {
            return Err(RcDriveError::invalid_config(
                "servo_min_pulse_us must be less than servo_max_pulse_us",
            ));
        }

        if f64::from(self.actuator.servo_max_pulse_us) >= period_us {
            return Err(RcDriveError::invalid_config(
                "servo_max_pulse_us must be shorter than the PWM period",
            ));
        }

        if self.actuator.servo_range_deg <= 0.0 {
            return Err(RcDriveError::invalid_config("servo_range_deg must be greater than 0"));
        }

        // Validate motors
        for (name, motor) in [("left", &self.motors.left), ("right", &self.motors.right)] {
            if motor.min_pw > motor.max_pw {
                return Err(RcDriveError::invalid_config(format!(
                    "motors.{name}: min_pw ({}) must not exceed max_pw ({})",
                    motor.min_pw, motor.max_pw
                )));
            }

            if motor.stop_pw < motor.min_pw || motor.stop_pw > motor.max_pw {
                return Err(RcDriveError::invalid_config(format!(
                    "motors.{name}: stop_pw must be within min_pw..=max_pw"
                )));
            }

            if f64::from(motor.max_pw) >= period_us {
                return Err(RcDriveError::invalid_config(format!(
                    "motors.{name}: max_pw must be shorter than the PWM period"
                )));
            }
        }

        if !(0.0..1.0).contains(&self.motors.dead_zone_fraction) {
            return Err(RcDriveError::invalid_config(
                "dead_zone_fraction must be at least 0 and less than 1",
            ));
        }

        // Validate steering
        for (name, servo) in [("front", &self.steering.front), ("rear", &self.steering.rear)] {
            if servo.min_deg >= servo.max_deg {
                return Err(RcDriveError::invalid_config(format!(
                    "steering.{name}: min_deg must be less than max_deg"
                )));
            }

            if servo.start_deg < servo.min_deg || servo.start_deg > servo.max_deg {
                return Err(RcDriveError::invalid_config(format!(
                    "steering.{name}: start_deg must be within min_deg..=max_deg"
                )));
            }

            if servo.half_range <= 0.0 {
                return Err(RcDriveError::invalid_config(format!(
                    "steering.{name}: half_range must be greater than 0"
                )));
            }
        }

        // Every output needs its own pin
        let pins = [
            self.motors.left.gpio,
            self.motors.right.gpio,
            self.steering.front.gpio,
            self.steering.rear.gpio,
        ];
        if pins.iter().collect::<HashSet<_>>().len() != pins.len() {
            return Err(RcDriveError::invalid_config("gpio pins must be unique across outputs"));
        }

        if self.hold.threshold_ms == 0 || self.hold.threshold_ms > 60000 {
            return Err(RcDriveError::invalid_config(
                "hold threshold_ms must be between 1 and 60000",
            ));
        }

        if self.host.reboot_command.is_empty() || self.host.shutdown_command.is_empty() {
            return Err(RcDriveError::invalid_config("host commands cannot be empty"));
        }

        if !self.logging.directory.is_empty() && self.logging.file_prefix.is_empty() {
            return Err(RcDriveError::invalid_config(
                "logging file_prefix cannot be empty when a directory is set",
            ));
        }

        Ok(())
    }
}
