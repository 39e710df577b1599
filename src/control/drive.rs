//! # Drive Mixer
//!
//! Turns stick deflection into an ESC pulse width per motor and brakes it with
//! the matching trigger.
//!
//! ## Base speed
//!
//! A normalized stick value `v` is scaled by the span on its side of stop:
//!
//! ```text
//! span = stop_pw - min_pw   if v < 0
//!        max_pw - stop_pw   otherwise
//! base = v * span + stop_pw
//! ```
//!
//! A base speed within `dead_zone_fraction * span` of `stop_pw` snaps to
//! exactly `stop_pw`. The band scales with each side's span, so a fraction of
//! `50 / 300` gives ±50 µs on a 1200/1500/1800 ESC and ±83 µs on a
//! 1000/1500/2000 one.
//!
//! ## Braking
//!
//! The trigger linearly pulls the base speed towards stop, whichever way the
//! motor is turning:
//!
//! ```text
//! output = base - t * (base - stop_pw)
//! ```
//!
//! The left trigger brakes the left motor, the right trigger the right motor.
//!
//! ```
//! use rc_drive::actuator::MotorId;
//! use rc_drive::control::drive::{DriveMixer, MotorChannel, Trigger};
//!
//! let channel = MotorChannel::new(1500, 1200, 1800)?;
//! let mut drive = DriveMixer::new([channel, channel], 50.0 / 300.0)?;
//!
//! drive.on_stick_event(MotorId::Left, 1.0);
//! drive.on_trigger_event(Trigger::Left, 0.5);
//! assert_eq!(drive.compute_output(MotorId::Left), 1650);
//! # Ok::<(), rc_drive::error::RcDriveError>(())
//! ```

use tracing::{debug, warn};

use crate::actuator::{Actuator, MotorId};
use crate::config::{MotorConfig, MotorsConfig};
use crate::error::{RcDriveError, Result};

/// Analog trigger selecting which motor it brakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Left,
    Right,
}

impl Trigger {
    /// The motor this trigger brakes.
    #[must_use]
    pub fn motor(self) -> MotorId {
        match self {
            Trigger::Left => MotorId::Left,
            Trigger::Right => MotorId::Right,
        }
    }
}

/// Pulse-width limits and current base speed of one ESC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorChannel {
    stop_pw: u16,
    min_pw: u16,
    max_pw: u16,
    current_base_speed: f32,
}

impl MotorChannel {
    /// Creates a stopped channel.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `min_pw > max_pw` or `stop_pw` lies
    /// outside `min_pw..=max_pw`.
    pub fn new(stop_pw: u16, min_pw: u16, max_pw: u16) -> Result<Self> {
        if min_pw > max_pw {
            return Err(RcDriveError::invalid_config(format!(
                "min_pw ({}) must not exceed max_pw ({})",
                min_pw, max_pw
            )));
        }
        if !(min_pw..=max_pw).contains(&stop_pw) {
            return Err(RcDriveError::invalid_config(format!(
                "stop_pw ({}) must be within {}..={}",
                stop_pw, min_pw, max_pw
            )));
        }

        Ok(Self {
            stop_pw,
            min_pw,
            max_pw,
            current_base_speed: f32::from(stop_pw),
        })
    }

    /// Creates a channel from its configuration section.
    pub fn from_config(config: &MotorConfig) -> Result<Self> {
        Self::new(config.stop_pw, config.min_pw, config.max_pw)
    }

    #[must_use]
    pub fn stop_pw(&self) -> u16 {
        self.stop_pw
    }

    #[must_use]
    pub fn current_base_speed(&self) -> f32 {
        self.current_base_speed
    }
}

/// Holds both motor channels and the shared trigger state.
#[derive(Debug, Clone)]
pub struct DriveMixer {
    channels: [MotorChannel; 2],
    dead_zone_fraction: f32,
    lt_value: f32,
    rt_value: f32,
}

impl DriveMixer {
    /// Creates a mixer for `[left, right]` channels.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `0 <= dead_zone_fraction < 1`.
    pub fn new(channels: [MotorChannel; 2], dead_zone_fraction: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&dead_zone_fraction) {
            return Err(RcDriveError::invalid_config(format!(
                "dead_zone_fraction ({}) must be at least 0 and less than 1",
                dead_zone_fraction
            )));
        }

        Ok(Self {
            channels,
            dead_zone_fraction,
            lt_value: 0.0,
            rt_value: 0.0,
        })
    }

    /// Creates a mixer from the `[motors]` configuration section.
    pub fn from_config(config: &MotorsConfig) -> Result<Self> {
        Self::new(
            [
                MotorChannel::from_config(&config.left)?,
                MotorChannel::from_config(&config.right)?,
            ],
            config.dead_zone_fraction,
        )
    }

    #[must_use]
    pub fn channel(&self, motor: MotorId) -> &MotorChannel {
        &self.channels[motor.index()]
    }

    /// Current brake value for the trigger.
    #[must_use]
    pub fn trigger_value(&self, trigger: Trigger) -> f32 {
        match trigger {
            Trigger::Left => self.lt_value,
            Trigger::Right => self.rt_value,
        }
    }

    /// Updates a motor's base speed from a normalized stick value.
    pub fn on_stick_event(&mut self, motor: MotorId, normalized_value: f32) {
        let dead_zone_fraction = self.dead_zone_fraction;
        let channel = &mut self.channels[motor.index()];
        let stop = f32::from(channel.stop_pw);

        let max_span = if normalized_value < 0.0 {
            stop - f32::from(channel.min_pw)
        } else {
            f32::from(channel.max_pw) - stop
        };

        let mut base = (normalized_value * max_span + stop)
            .clamp(f32::from(channel.min_pw), f32::from(channel.max_pw));

        if (base - stop).abs() <= dead_zone_fraction * max_span {
            base = stop;
        }

        channel.current_base_speed = base;
    }

    /// Stores a normalized trigger value.
    pub fn on_trigger_event(&mut self, trigger: Trigger, normalized_value: f32) {
        match trigger {
            Trigger::Left => self.lt_value = normalized_value,
            Trigger::Right => self.rt_value = normalized_value,
        }
    }

    /// Final pulse width for a motor after braking, truncated to whole µs.
    #[must_use]
    pub fn compute_output(&self, motor: MotorId) -> u16 {
        let channel = &self.channels[motor.index()];
        let t = match motor {
            MotorId::Left => self.lt_value,
            MotorId::Right => self.rt_value,
        };

        let base = channel.current_base_speed;
        let stop = f32::from(channel.stop_pw);
        (base - t * (base - stop)) as u16
    }

    /// Computes a motor's output and asserts it continuously on the actuator.
    ///
    /// # Errors
    ///
    /// Propagates the actuator write error.
    pub fn write_output<A: Actuator + ?Sized>(&self, motor: MotorId, actuator: &mut A) -> Result<u16> {
        let pulse_width = self.compute_output(motor);
        actuator.write_pulse_width(motor, pulse_width, true)?;
        Ok(pulse_width)
    }

    /// Resets both motors and triggers to rest and writes stop to the ESCs.
    pub fn stop_all<A: Actuator + ?Sized>(&mut self, actuator: &mut A) {
        self.lt_value = 0.0;
        self.rt_value = 0.0;

        for motor in MotorId::ALL {
            let channel = &mut self.channels[motor.index()];
            channel.current_base_speed = f32::from(channel.stop_pw);
            if let Err(e) = actuator.write_pulse_width(motor, channel.stop_pw, true) {
                warn!("Failed to stop {:?} motor: {}", motor, e);
            }
        }

        debug!("Motors stopped");
    }
}
