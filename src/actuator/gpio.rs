//! # GPIO PWM Actuator
//!
//! Drives ESCs and hobby servos from Raspberry Pi GPIO pins using `rppal`
//! software PWM at a fixed frame rate (50 Hz by default).
//!
//! ESC pulse widths are written as-is. Servo angles are mapped linearly from
//! `0..=servo_range_deg` onto `servo_min_pulse_us..=servo_max_pulse_us`.

use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, info};

use super::{Actuator, MotorId, SteeringId};
use crate::config::{ActuatorConfig, Config};
use crate::error::{RcDriveError, Result};

/// Linear servo pulse mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoPulseMap {
    min_pulse_us: f32,
    max_pulse_us: f32,
    range_deg: f32,
}

impl ServoPulseMap {
    #[must_use]
    pub fn from_config(config: &ActuatorConfig) -> Self {
        Self {
            min_pulse_us: f32::from(config.servo_min_pulse_us),
            max_pulse_us: f32::from(config.servo_max_pulse_us),
            range_deg: config.servo_range_deg,
        }
    }

    /// Converts an angle to a pulse width, saturating at the mechanical ends.
    ///
    /// ```
    /// use rc_drive::actuator::gpio::ServoPulseMap;
    /// use rc_drive::config::ActuatorConfig;
    ///
    /// let map = ServoPulseMap::from_config(&ActuatorConfig::default());
    /// assert_eq!(map.pulse_us(90.0), 1500);
    /// ```
    #[must_use]
    pub fn pulse_us(&self, degrees: f32) -> u16 {
        let degrees = degrees.clamp(0.0, self.range_deg);
        let span = self.max_pulse_us - self.min_pulse_us;
        (self.min_pulse_us + degrees / self.range_deg * span).round() as u16
    }
}

/// Four PWM outputs on Raspberry Pi GPIO.
pub struct GpioActuator {
    motors: [OutputPin; 2],
    servos: [OutputPin; 2],
    period: Duration,
    servo_map: ServoPulseMap,
}

impl std::fmt::Debug for GpioActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpioActuator")
            .field("motor_pins", &[self.motors[0].pin(), self.motors[1].pin()])
            .field("servo_pins", &[self.servos[0].pin(), self.servos[1].pin()])
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl GpioActuator {
    /// Claims the four output pins named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RcDriveError::Actuator`] if the GPIO peripheral is not
    /// accessible or a pin is already in use.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_drive::actuator::gpio::GpioActuator;
    /// use rc_drive::config::Config;
    ///
    /// let actuator = GpioActuator::open(&Config::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &Config) -> Result<Self> {
        let gpio = Gpio::new()
            .map_err(|e| RcDriveError::Actuator(format!("Failed to open GPIO: {}", e)))?;

        let claim = |pin: u8| -> Result<OutputPin> {
            gpio.get(pin)
                .map(|p| p.into_output_low())
                .map_err(|e| RcDriveError::Actuator(format!("Failed to claim GPIO {}: {}", pin, e)))
        };

        let actuator = Self {
            motors: [claim(config.motors.left.gpio)?, claim(config.motors.right.gpio)?],
            servos: [claim(config.steering.front.gpio)?, claim(config.steering.rear.gpio)?],
            period: Duration::from_secs_f64(1.0 / config.actuator.pwm_frequency_hz),
            servo_map: ServoPulseMap::from_config(&config.actuator),
        };

        info!(
            "PWM outputs ready at {}Hz: motors on GPIO {}/{}, servos on GPIO {}/{}",
            config.actuator.pwm_frequency_hz,
            config.motors.left.gpio,
            config.motors.right.gpio,
            config.steering.front.gpio,
            config.steering.rear.gpio
        );

        Ok(actuator)
    }

    fn set_pulse(pin: &mut OutputPin, period: Duration, pulse_us: u16) -> Result<()> {
        pin.set_pwm(period, Duration::from_micros(u64::from(pulse_us)))
            .map_err(|e| RcDriveError::Actuator(format!("GPIO {}: {}", pin.pin(), e)))
    }
}

impl Actuator for GpioActuator {
    fn write_pulse_width(&mut self, motor: MotorId, pulse_width: u16, hold: bool) -> Result<()> {
        let period = self.period;
        let pin = &mut self.motors[motor.index()];
        Self::set_pulse(pin, period, pulse_width)?;

        if !hold {
            // Single frame only
            std::thread::sleep(period);
            pin.clear_pwm()
                .map_err(|e| RcDriveError::Actuator(format!("GPIO {}: {}", pin.pin(), e)))?;
        }

        debug!("{:?} motor pulse {}µs (hold: {})", motor, pulse_width, hold);
        Ok(())
    }

    fn write_angle(&mut self, channel: SteeringId, degrees: f32) -> Result<()> {
        let pulse_us = self.servo_map.pulse_us(degrees);
        Self::set_pulse(&mut self.servos[channel.index()], self.period, pulse_us)?;
        debug!("{:?} servo {:.1}° ({}µs)", channel, degrees, pulse_us);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servo_map_endpoints() {
        let map = ServoPulseMap::from_config(&ActuatorConfig::default());
        assert_eq!(map.pulse_us(0.0), 500);
        assert_eq!(map.pulse_us(90.0), 1500);
        assert_eq!(map.pulse_us(180.0), 2500);
    }

    #[test]
    fn test_servo_map_saturates() {
        let map = ServoPulseMap::from_config(&ActuatorConfig::default());
        assert_eq!(map.pulse_us(-45.0), 500);
        assert_eq!(map.pulse_us(270.0), 2500);
    }

    #[test]
    fn test_servo_map_custom_range() {
        let config = ActuatorConfig {
            servo_min_pulse_us: 1000,
            servo_max_pulse_us: 2000,
            servo_range_deg: 120.0,
            ..ActuatorConfig::default()
        };
        let map = ServoPulseMap::from_config(&config);
        assert_eq!(map.pulse_us(60.0), 1500);
        assert_eq!(map.pulse_us(30.0), 1250);
    }

    // Integration test - only runs on a Raspberry Pi
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_open_with_real_hardware() {
        let mut actuator = GpioActuator::open(&Config::default()).expect("GPIO not available");
        assert!(actuator.write_pulse_width(MotorId::Left, 1500, true).is_ok());
        assert!(actuator.write_angle(SteeringId::Front, 90.0).is_ok());
    }
}
