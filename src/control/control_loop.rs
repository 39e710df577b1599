//! # Control Loop
//!
//! Consumes the blocking gamepad event stream and drives the actuators.
//!
//! For every event, in order:
//!
//! 1. Stick and trigger values are normalized and fed to the [`DriveMixer`];
//!    both motors are then re-asserted with `hold`.
//! 2. Steering axes go to the [`SteeringMixer`]; `A` stores the trim.
//! 3. `Start` and `Back` feed their [`HoldTimer`]s (reboot / shutdown).
//! 4. A `B` press stops the vehicle and ends the loop with
//!    [`LoopExit::Restart`]; the supervisor rebuilds everything from scratch.
//!
//! The loop has no stop condition of its own. It returns only on a restart
//! request or when the stream ends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::drive::{DriveMixer, Trigger};
use super::hold::{HoldAction, HoldPhase, HoldTimer, KEY_PRESSED};
use super::normalize::{normalize_stick, normalize_trigger, DeviceCapabilities};
use super::steering::SteeringMixer;
use crate::actuator::{Actuator, MotorId, SteeringId};
use crate::config::Config;
use crate::controller::haptics::Haptics;
use crate::controller::mapper::{Button, InputCode, InputEvent};
use crate::error::Result;
use crate::host::HostActions;

/// Why [`ControlLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The restart button was pressed.
    Restart,
    /// The input stream ended (device lost).
    StreamEnded,
}

/// Event dispatcher owning the mixers and hold timers.
pub struct ControlLoop<A: Actuator> {
    caps: DeviceCapabilities,
    invert_drive_axes: bool,
    drive: DriveMixer,
    steering: SteeringMixer,
    hold_timers: HashMap<Button, HoldTimer>,
    actuator: A,
}

impl<A: Actuator> std::fmt::Debug for ControlLoop<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("caps", &self.caps)
            .field("drive", &self.drive)
            .field("steering", &self.steering)
            .field("hold_timers", &self.hold_timers)
            .finish_non_exhaustive()
    }
}

impl<A: Actuator> ControlLoop<A> {
    /// Builds the control stack.
    ///
    /// `runtime` hosts the hold countdowns; `Start` reboots and `Back` shuts
    /// down the host after `hold.threshold_ms`.
    ///
    /// # Errors
    ///
    /// Returns a fatal error for zero device capabilities or invalid motor or
    /// steering configuration.
    pub fn new(
        config: &Config,
        caps: DeviceCapabilities,
        actuator: A,
        haptics: Arc<dyn Haptics>,
        host: Arc<dyn HostActions>,
        runtime: Handle,
    ) -> Result<Self> {
        caps.validate()?;

        let threshold = Duration::from_millis(config.hold.threshold_ms);
        let rumble_ms = config.controller.rumble_ms;

        let host_action = |run: fn(&dyn HostActions)| -> HoldAction {
            let host = Arc::clone(&host);
            let haptics = Arc::clone(&haptics);
            Arc::new(move || {
                haptics.rumble(rumble_ms);
                run(host.as_ref());
            })
        };

        let mut hold_timers = HashMap::new();
        hold_timers.insert(
            Button::Start,
            HoldTimer::new(
                "START",
                threshold,
                host_action(|host: &dyn HostActions| host.reboot_host()),
                Arc::clone(&haptics),
                rumble_ms,
                runtime.clone(),
            ),
        );
        hold_timers.insert(
            Button::Back,
            HoldTimer::new(
                "BACK",
                threshold,
                host_action(|host: &dyn HostActions| host.shutdown_host()),
                Arc::clone(&haptics),
                rumble_ms,
                runtime,
            ),
        );

        Ok(Self {
            caps,
            invert_drive_axes: config.controller.invert_drive_axes,
            drive: DriveMixer::from_config(&config.motors)?,
            steering: SteeringMixer::from_config(&config.steering)?,
            hold_timers,
            actuator,
        })
    }

    #[must_use]
    pub fn drive(&self) -> &DriveMixer {
        &self.drive
    }

    #[must_use]
    pub fn steering(&self) -> &SteeringMixer {
        &self.steering
    }

    #[must_use]
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Phase of a monitored button's hold timer.
    #[must_use]
    pub fn hold_phase(&self, button: Button) -> Option<HoldPhase> {
        self.hold_timers.get(&button).map(HoldTimer::phase)
    }

    /// Drains `events` until a restart request or the end of the stream.
    pub fn run<I>(&mut self, events: I) -> LoopExit
    where
        I: IntoIterator<Item = InputEvent>,
    {
        info!("Control loop running");

        for event in events {
            if let Some(exit) = self.handle_event(event) {
                info!("Restart requested");
                self.flush();
                return exit;
            }
        }

        info!("Input stream ended");
        self.flush();
        LoopExit::StreamEnded
    }

    /// Dispatches one event. Returns `Some` when the loop should end.
    pub fn handle_event(&mut self, event: InputEvent) -> Option<LoopExit> {
        let InputEvent { code, value } = event;

        match code {
            InputCode::DriveLeft => self.on_drive_axis(MotorId::Left, value),
            InputCode::DriveRight => self.on_drive_axis(MotorId::Right, value),
            InputCode::TriggerLeft => self.on_trigger(Trigger::Left, value),
            InputCode::TriggerRight => self.on_trigger(Trigger::Right, value),
            _ => {}
        }
        self.write_motors();

        match code {
            InputCode::SteerFront => self.on_steer_axis(SteeringId::Front, value),
            InputCode::SteerRear => self.on_steer_axis(SteeringId::Rear, value),
            InputCode::Button(Button::A) if value == KEY_PRESSED => {
                for id in SteeringId::ALL {
                    self.steering.trim(id);
                }
                info!(
                    "Steering trim stored: front {:.1}°, rear {:.1}°",
                    self.steering.channel(SteeringId::Front).trim_deg(),
                    self.steering.channel(SteeringId::Rear).trim_deg()
                );
            }
            InputCode::Button(button) => {
                if let Some(timer) = self.hold_timers.get(&button) {
                    timer.on_event(value);
                }
                if button == Button::B && value == KEY_PRESSED {
                    return Some(LoopExit::Restart);
                }
            }
            _ => {}
        }

        None
    }

    /// Cancels pending holds and brings both motors to stop.
    pub fn flush(&mut self) {
        for timer in self.hold_timers.values() {
            timer.cancel();
        }
        self.drive.stop_all(&mut self.actuator);
    }

    fn on_drive_axis(&mut self, motor: MotorId, raw: i32) {
        let mut value = normalize_stick(raw, self.caps.max_stick_value);
        if self.invert_drive_axes {
            value = -value;
        }
        self.drive.on_stick_event(motor, value);
    }

    fn on_trigger(&mut self, trigger: Trigger, raw: i32) {
        let value = normalize_trigger(raw, self.caps.max_trigger_value);
        self.drive.on_trigger_event(trigger, value);
    }

    fn on_steer_axis(&mut self, id: SteeringId, raw: i32) {
        let value = normalize_stick(raw, self.caps.max_stick_value);
        match self.steering.on_steer_event(id, value, &mut self.actuator) {
            Ok(deg) => debug!("{:?} steering {:.1}°", id, deg),
            Err(e) => warn!("Failed to write {:?} steering: {}", id, e),
        }
    }

    fn write_motors(&mut self) {
        let mut outputs = [0u16; 2];
        for motor in MotorId::ALL {
            match self.drive.write_output(motor, &mut self.actuator) {
                Ok(pw) => outputs[motor.index()] = pw,
                Err(e) => warn!("Failed to write {:?} motor: {}", motor, e),
            }
        }
        debug!("Speed left: {}  right: {}", outputs[0], outputs[1]);
    }
}
