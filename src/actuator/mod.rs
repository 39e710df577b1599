//! # Actuator Module
//!
//! Output side of the vehicle: two ESC-driven motors and two steering servos.
//!
//! The control code only sees the [`Actuator`] trait. [`gpio::GpioActuator`]
//! implements it with Raspberry Pi software PWM; tests substitute a mock.
//! [`shared::SharedActuator`] wraps either so the supervisor can halt the
//! outputs while the control thread owns them.

pub mod gpio;
pub mod shared;

use crate::error::Result;

/// Drive motor output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorId {
    Left,
    Right,
}

impl MotorId {
    pub const ALL: [MotorId; 2] = [MotorId::Left, MotorId::Right];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            MotorId::Left => 0,
            MotorId::Right => 1,
        }
    }
}

/// Steering servo output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SteeringId {
    Front,
    Rear,
}

impl SteeringId {
    pub const ALL: [SteeringId; 2] = [SteeringId::Front, SteeringId::Rear];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            SteeringId::Front => 0,
            SteeringId::Rear => 1,
        }
    }
}

/// Write primitive for motor and servo outputs.
///
/// Writes are fire-and-forget: there is no acknowledgement from the hardware,
/// an `Err` only means the command could not be issued.
#[cfg_attr(test, mockall::automock)]
pub trait Actuator: Send {
    /// Sets an ESC pulse width in microseconds.
    ///
    /// With `hold` the pulse train is re-asserted continuously until the next
    /// write; without it the pulse is emitted for a single PWM frame.
    fn write_pulse_width(&mut self, motor: MotorId, pulse_width: u16, hold: bool) -> Result<()>;

    /// Moves a steering servo to `degrees`.
    fn write_angle(&mut self, channel: SteeringId, degrees: f32) -> Result<()>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::RcDriveError;

    /// Records every write in order.
    #[derive(Debug, Default)]
    pub struct RecordingActuator {
        pub pulses: Vec<(MotorId, u16, bool)>,
        pub angles: Vec<(SteeringId, f32)>,
        pub fail: bool,
    }

    impl RecordingActuator {
        pub fn new() -> Self {
            Self::default()
        }

        /// Last pulse width written to `motor`.
        pub fn last_pulse(&self, motor: MotorId) -> Option<u16> {
            self.pulses.iter().rev().find(|(m, _, _)| *m == motor).map(|(_, pw, _)| *pw)
        }

        /// Last angle written to `channel`.
        pub fn last_angle(&self, channel: SteeringId) -> Option<f32> {
            self.angles.iter().rev().find(|(c, _)| *c == channel).map(|(_, deg)| *deg)
        }
    }

    impl Actuator for RecordingActuator {
        fn write_pulse_width(&mut self, motor: MotorId, pulse_width: u16, hold: bool) -> Result<()> {
            if self.fail {
                return Err(RcDriveError::Actuator("Mock write error".into()));
            }
            self.pulses.push((motor, pulse_width, hold));
            Ok(())
        }

        fn write_angle(&mut self, channel: SteeringId, degrees: f32) -> Result<()> {
            if self.fail {
                return Err(RcDriveError::Actuator("Mock write error".into()));
            }
            self.angles.push((channel, degrees));
            Ok(())
        }
    }
}
