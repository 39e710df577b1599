//! # Shared Actuator
//!
//! Lets the supervisor reach the outputs while the control thread owns them.
//!
//! The control thread may be parked in a device read when Ctrl+C arrives, so
//! it cannot be relied on to stop the motors. [`SharedActuator::halt`] writes
//! stop from the supervisor and latches: every later write from the control
//! thread is refused, so a late stick event cannot restart the motors.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use super::{Actuator, MotorId, SteeringId};
use crate::error::{RcDriveError, Result};

struct Inner<A> {
    actuator: A,
    halted: bool,
}

/// Cloneable handle to one actuator.
pub struct SharedActuator<A> {
    inner: Arc<Mutex<Inner<A>>>,
}

impl<A> Clone for SharedActuator<A> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<A> std::fmt::Debug for SharedActuator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedActuator")
            .field("halted", &self.lock().halted)
            .finish_non_exhaustive()
    }
}

impl<A> SharedActuator<A> {
    #[must_use]
    pub fn new(actuator: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { actuator, halted: false })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<A>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.lock().halted
    }
}

impl<A: Actuator> SharedActuator<A> {
    /// Writes `stop_pw` (`[left, right]`) to both motors and refuses all
    /// further writes.
    ///
    /// # Errors
    ///
    /// Returns the first failed stop write. The handle is halted regardless.
    pub fn halt(&self, stop_pw: [u16; 2]) -> Result<()> {
        let mut inner = self.lock();
        inner.halted = true;

        let mut result = Ok(());
        for motor in MotorId::ALL {
            let written = inner.actuator.write_pulse_width(motor, stop_pw[motor.index()], true);
            if result.is_ok() {
                result = written;
            }
        }

        info!("Outputs halted");
        result
    }
}

fn halted_error() -> RcDriveError {
    RcDriveError::Actuator("outputs are halted".to_string())
}

impl<A: Actuator> Actuator for SharedActuator<A> {
    fn write_pulse_width(&mut self, motor: MotorId, pulse_width: u16, hold: bool) -> Result<()> {
        let mut inner = self.lock();
        if inner.halted {
            return Err(halted_error());
        }
        inner.actuator.write_pulse_width(motor, pulse_width, hold)
    }

    fn write_angle(&mut self, channel: SteeringId, degrees: f32) -> Result<()> {
        let mut inner = self.lock();
        if inner.halted {
            return Err(halted_error());
        }
        inner.actuator.write_angle(channel, degrees)
    }
}
