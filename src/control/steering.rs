//! # Steering Mixer
//!
//! Maps a normalized stick value onto a servo angle around a trimmable
//! neutral point.
//!
//! ```text
//! deg = v * half_range + trim_deg       (v negated on a reversed channel)
//! deg = clamp(deg, min_deg, max_deg)
//! ```
//!
//! `trim_deg` is the absolute neutral angle. It starts at the configured
//! start angle; [`SteeringMixer::trim`] replaces it with whatever angle was
//! last commanded, so holding the stick at the desired straight-ahead
//! position and trimming recalibrates the centre.

use tracing::debug;

use crate::actuator::{Actuator, SteeringId};
use crate::config::{ServoConfig, SteeringConfig};
use crate::error::{RcDriveError, Result};

/// Angle limits, trim and last command of one steering servo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringChannel {
    min_deg: f32,
    max_deg: f32,
    half_range: f32,
    trim_deg: f32,
    reversed: bool,
    last_commanded_deg: f32,
}

impl SteeringChannel {
    /// Creates a channel resting at `start_deg`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the limits are inverted, `start_deg`
    /// lies outside them or `half_range` is not positive.
    pub fn new(min_deg: f32, max_deg: f32, start_deg: f32, half_range: f32) -> Result<Self> {
        if !(min_deg < max_deg) {
            return Err(RcDriveError::invalid_config(format!(
                "min_deg ({}) must be less than max_deg ({})",
                min_deg, max_deg
            )));
        }
        if !(min_deg..=max_deg).contains(&start_deg) {
            return Err(RcDriveError::invalid_config(format!(
                "start_deg ({}) must be within {}..={}",
                start_deg, min_deg, max_deg
            )));
        }
        if !(half_range > 0.0) {
            return Err(RcDriveError::invalid_config("half_range must be greater than 0"));
        }

        Ok(Self {
            min_deg,
            max_deg,
            half_range,
            trim_deg: start_deg,
            reversed: false,
            last_commanded_deg: start_deg,
        })
    }

    /// Inverts the stick direction for this channel.
    #[must_use]
    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// Creates a channel from its configuration section.
    pub fn from_config(config: &ServoConfig) -> Result<Self> {
        Ok(Self::new(config.min_deg, config.max_deg, config.start_deg, config.half_range)?
            .reversed(config.reversed))
    }

    #[must_use]
    pub fn trim_deg(&self) -> f32 {
        self.trim_deg
    }

    #[must_use]
    pub fn last_commanded_deg(&self) -> f32 {
        self.last_commanded_deg
    }

    /// Angle for a normalized stick value, without side effects.
    #[must_use]
    pub fn angle_for(&self, normalized_value: f32) -> f32 {
        let v = if self.reversed { -normalized_value } else { normalized_value };
        (v * self.half_range + self.trim_deg).clamp(self.min_deg, self.max_deg)
    }
}

/// Holds the front and rear steering channels.
#[derive(Debug, Clone)]
pub struct SteeringMixer {
    channels: [SteeringChannel; 2],
}

impl SteeringMixer {
    /// Creates a mixer for `[front, rear]` channels.
    #[must_use]
    pub fn new(channels: [SteeringChannel; 2]) -> Self {
        Self { channels }
    }

    /// Creates a mixer from the `[steering]` configuration section.
    pub fn from_config(config: &SteeringConfig) -> Result<Self> {
        Ok(Self::new([
            SteeringChannel::from_config(&config.front)?,
            SteeringChannel::from_config(&config.rear)?,
        ]))
    }

    #[must_use]
    pub fn channel(&self, id: SteeringId) -> &SteeringChannel {
        &self.channels[id.index()]
    }

    /// Commands a channel from a normalized stick value and writes it out.
    ///
    /// The angle is recorded as last commanded even if the write fails.
    ///
    /// # Errors
    ///
    /// Propagates the actuator write error.
    pub fn on_steer_event<A: Actuator + ?Sized>(
        &mut self,
        id: SteeringId,
        normalized_value: f32,
        actuator: &mut A,
    ) -> Result<f32> {
        let channel = &mut self.channels[id.index()];
        let deg = channel.angle_for(normalized_value);
        channel.last_commanded_deg = deg;
        actuator.write_angle(id, deg)?;
        Ok(deg)
    }

    /// Stores the channel's last commanded angle as its neutral trim.
    pub fn trim(&mut self, id: SteeringId) {
        let channel = &mut self.channels[id.index()];
        channel.trim_deg = channel.last_commanded_deg;
        debug!("{:?} steering trimmed to {:.1}°", id, channel.trim_deg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MockActuator;
    use mockall::predicate::eq;

    fn reference_channel() -> SteeringChannel {
        SteeringChannel::new(0.0, 180.0, 90.0, 90.0).unwrap()
    }

    fn accepting_actuator() -> MockActuator {
        let mut actuator = MockActuator::new();
        actuator.expect_write_angle().returning(|_, _| Ok(()));
        actuator
    }

    #[test]
    fn test_invalid_channels() {
        assert!(SteeringChannel::new(180.0, 0.0, 90.0, 90.0).is_err());
        assert!(SteeringChannel::new(0.0, 180.0, 200.0, 90.0).is_err());
        assert!(SteeringChannel::new(0.0, 180.0, 90.0, 0.0).is_err());
        assert!(SteeringChannel::new(0.0, 180.0, 90.0, f32::NAN).is_err());
    }

    #[test]
    fn test_centre_full_left_full_right() {
        let channel = reference_channel();
        assert_eq!(channel.angle_for(0.0), 90.0);
        assert_eq!(channel.angle_for(-1.0), 0.0);
        assert_eq!(channel.angle_for(1.0), 180.0);
        assert_eq!(channel.angle_for(0.5), 135.0);
    }

    #[test]
    fn test_reversed_channel_mirrors() {
        let channel = reference_channel().reversed(true);
        assert_eq!(channel.angle_for(1.0), 0.0);
        assert_eq!(channel.angle_for(-1.0), 180.0);
        assert_eq!(channel.angle_for(0.5), 45.0);
    }

    #[test]
    fn test_output_always_clamped() {
        let limits = SteeringChannel::new(30.0, 150.0, 90.0, 90.0).unwrap();
        let mut actuator = accepting_actuator();

        for trim_input in [-1.0f32, -0.5, 0.0, 0.5, 1.0] {
            let mut steering = SteeringMixer::new([limits, limits.reversed(true)]);
            // Store an arbitrary trim first
            for id in SteeringId::ALL {
                steering.on_steer_event(id, trim_input, &mut actuator).unwrap();
                steering.trim(id);
            }

            for i in -20..=20 {
                let v = i as f32 / 20.0;
                for id in SteeringId::ALL {
                    let deg = steering.on_steer_event(id, v, &mut actuator).unwrap();
                    assert!(
                        (30.0..=150.0).contains(&deg),
                        "{:?} input {} with trim {} produced {}",
                        id,
                        v,
                        steering.channel(id).trim_deg(),
                        deg
                    );
                }
            }
        }
    }

    #[test]
    fn test_steer_writes_angle() {
        let mut steering = SteeringMixer::new([reference_channel(), reference_channel()]);
        let mut actuator = MockActuator::new();
        actuator
            .expect_write_angle()
            .with(eq(SteeringId::Rear), eq(135.0))
            .times(1)
            .returning(|_, _| Ok(()));

        let deg = steering.on_steer_event(SteeringId::Rear, 0.5, &mut actuator).unwrap();
        assert_eq!(deg, 135.0);
        assert_eq!(steering.channel(SteeringId::Rear).last_commanded_deg(), 135.0);
        assert_eq!(steering.channel(SteeringId::Front).last_commanded_deg(), 90.0);
    }

    #[test]
    fn test_write_failure_still_records_command() {
        let mut steering = SteeringMixer::new([reference_channel(), reference_channel()]);
        let mut actuator = MockActuator::new();
        actuator
            .expect_write_angle()
            .returning(|_, _| Err(RcDriveError::Actuator("pin busy".into())));

        assert!(steering.on_steer_event(SteeringId::Front, 1.0, &mut actuator).is_err());
        assert_eq!(steering.channel(SteeringId::Front).last_commanded_deg(), 180.0);
    }

    #[test]
    fn test_trim_scenario() {
        let mut steering = SteeringMixer::new([reference_channel(), reference_channel()]);
        let mut actuator = accepting_actuator();

        let deg = steering.on_steer_event(SteeringId::Front, 0.0, &mut actuator).unwrap();
        assert_eq!(deg, 90.0);

        steering.trim(SteeringId::Front);
        assert_eq!(steering.channel(SteeringId::Front).trim_deg(), 90.0);

        // Trim is the neutral angle, so centre stays centre
        let deg = steering.on_steer_event(SteeringId::Front, 0.0, &mut actuator).unwrap();
        assert_eq!(deg, 90.0);
    }

    #[test]
    fn test_trim_moves_neutral() {
        let mut steering = SteeringMixer::new([reference_channel(), reference_channel()]);
        let mut actuator = accepting_actuator();

        steering.on_steer_event(SteeringId::Front, 0.1, &mut actuator).unwrap();
        steering.trim(SteeringId::Front);
        assert_eq!(steering.channel(SteeringId::Front).trim_deg(), 99.0);

        let deg = steering.on_steer_event(SteeringId::Front, 0.0, &mut actuator).unwrap();
        assert_eq!(deg, 99.0);

        // Rear untouched
        assert_eq!(steering.channel(SteeringId::Rear).trim_deg(), 90.0);
    }

    #[test]
    fn test_trim_is_idempotent() {
        let mut steering = SteeringMixer::new([reference_channel(), reference_channel()]);
        let mut actuator = accepting_actuator();

        steering.on_steer_event(SteeringId::Rear, -0.25, &mut actuator).unwrap();
        steering.trim(SteeringId::Rear);
        let first = steering.channel(SteeringId::Rear).trim_deg();

        steering.trim(SteeringId::Rear);
        assert_eq!(steering.channel(SteeringId::Rear).trim_deg(), first);
    }

    #[test]
    fn test_trim_without_steering_keeps_start() {
        let mut steering = SteeringMixer::new([reference_channel(), reference_channel()]);
        steering.trim(SteeringId::Front);
        assert_eq!(steering.channel(SteeringId::Front).trim_deg(), 90.0);
    }
}
