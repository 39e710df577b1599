//! # Gamepad Module
//!
//! Detects and opens an evdev gamepad, queries its axis extrema and exposes
//! its input as a blocking stream of [`InputEvent`]s.
//!
//! ## Controller Detection
//!
//! When no device path is configured, the first `/dev/input/event*` node
//! (in sorted order) that reports the layout's drive axes and the `A`/`B`
//! buttons is used.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use evdev::Device;
use tracing::{debug, info, warn};

use super::mapper::{ControllerLayout, EventMapper, InputEvent};
use crate::control::normalize::DeviceCapabilities;
use crate::error::{RcDriveError, Result};

/// Gamepad handle
///
/// Represents an open evdev gamepad together with the mapper that translates
/// its events.
pub struct Gamepad {
    device: Device,
    device_path: PathBuf,
    mapper: EventMapper,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("name", &self.device.name())
            .finish_non_exhaustive()
    }
}

impl Gamepad {
    /// Open the configured device, or auto-detect one if `device_path` is empty.
    ///
    /// # Errors
    ///
    /// - `Controller`: the configured device cannot be opened
    /// - `ControllerNotFound`: auto-detection found no gamepad
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_drive::controller::gamepad::Gamepad;
    /// use rc_drive::controller::mapper::ControllerLayout;
    ///
    /// let gamepad = Gamepad::open("", ControllerLayout::default())?;
    /// println!("Connected to gamepad at: {}", gamepad.device_path().display());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(device_path: &str, layout: ControllerLayout) -> Result<Self> {
        if device_path.is_empty() {
            Self::detect(layout)
        } else {
            Self::open_path(Path::new(device_path), layout)
        }
    }

    /// Open a specific event node.
    pub fn open_path(path: &Path, layout: ControllerLayout) -> Result<Self> {
        let device = Device::open(path).map_err(|e| {
            RcDriveError::Controller(format!("Failed to open {}: {}", path.display(), e))
        })?;

        info!(
            "Opened gamepad {:?} at {}",
            device.name().unwrap_or("unknown"),
            path.display()
        );

        Ok(Self {
            device,
            device_path: path.to_path_buf(),
            mapper: EventMapper::with_layout(layout),
        })
    }

    /// Scan `/dev/input` for the first device that looks like a gamepad.
    pub fn detect(layout: ControllerLayout) -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(RcDriveError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| RcDriveError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| RcDriveError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Sort entries for deterministic device selection when multiple pads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with("event"));
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({:?})",
                        path.display(),
                        device.name().unwrap_or("unknown")
                    );

                    if looks_like_gamepad(&device, &layout) {
                        info!(
                            "Found gamepad {:?} at: {}",
                            device.name().unwrap_or("unknown"),
                            path.display()
                        );

                        return Ok(Self {
                            device,
                            device_path: path,
                            mapper: EventMapper::with_layout(layout),
                        });
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(RcDriveError::ControllerNotFound)
    }

    /// Path of the event node in use.
    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    /// Human-readable device name.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Read the stick and trigger extrema from the kernel's abs info.
    ///
    /// Stick limits come from the left-motor axis, the trigger limit from the
    /// left-trigger axis.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if abs info cannot be read, `Capability` if any
    /// extremum is zero.
    pub fn capabilities(&self) -> Result<DeviceCapabilities> {
        let abs = self
            .device
            .get_abs_state()
            .map_err(|e| RcDriveError::Controller(format!("Failed to read axis info: {}", e)))?;

        let layout = self.mapper.layout();
        let stick = abs[usize::from(layout.drive_left.0)];
        let trigger = abs[usize::from(layout.trigger_left.0)];

        let caps = DeviceCapabilities {
            max_stick_value: stick.maximum,
            min_stick_value: stick.minimum,
            max_trigger_value: trigger.maximum,
        };
        caps.validate()?;

        info!(
            "Axis ranges: sticks {}..{}, triggers 0..{}",
            caps.min_stick_value, caps.max_stick_value, caps.max_trigger_value
        );
        Ok(caps)
    }

    /// Converts the gamepad into a blocking iterator of mapped events.
    ///
    /// The iterator ends when the device stops delivering events
    /// (e.g. the pad was unplugged).
    pub fn into_events(self) -> GamepadEvents {
        GamepadEvents {
            device: self.device,
            device_path: self.device_path,
            queue: EventQueue::new(self.mapper),
        }
    }
}

fn looks_like_gamepad(device: &Device, layout: &ControllerLayout) -> bool {
    let has_axes = device.supported_absolute_axes().map_or(false, |axes| {
        axes.contains(layout.drive_left) && axes.contains(layout.drive_right)
    });
    let has_buttons = device
        .supported_keys()
        .map_or(false, |keys| keys.contains(layout.a) && keys.contains(layout.b));
    has_axes && has_buttons
}

/// Translated events waiting to be handed out, one raw batch at a time.
#[derive(Debug)]
struct EventQueue {
    mapper: EventMapper,
    pending: VecDeque<InputEvent>,
}

impl EventQueue {
    fn new(mapper: EventMapper) -> Self {
        Self { mapper, pending: VecDeque::new() }
    }

    /// Pops the next mapped event, calling `fetch` for new raw batches while
    /// none is pending. Returns `None` once `fetch` fails.
    fn next_with<F>(&mut self, mut fetch: F) -> Option<InputEvent>
    where
        F: FnMut() -> std::io::Result<Vec<evdev::InputEvent>>,
    {
        while self.pending.is_empty() {
            match fetch() {
                Ok(events) => {
                    let mapper = &self.mapper;
                    self.pending
                        .extend(events.iter().filter_map(|event| mapper.translate(event)));
                }
                Err(e) => {
                    warn!("Gamepad stopped delivering events: {}", e);
                    return None;
                }
            }
        }
        self.pending.pop_front()
    }
}

/// Blocking stream of [`InputEvent`]s read from a [`Gamepad`].
pub struct GamepadEvents {
    device: Device,
    device_path: PathBuf,
    queue: EventQueue,
}

impl std::fmt::Debug for GamepadEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamepadEvents")
            .field("device_path", &self.device_path)
            .field("pending", &self.queue.pending.len())
            .finish_non_exhaustive()
    }
}

impl Iterator for GamepadEvents {
    type Item = InputEvent;

    fn next(&mut self) -> Option<InputEvent> {
        let device = &mut self.device;
        let event = self
            .queue
            .next_with(|| device.fetch_events().map(|events| events.collect()));

        if event.is_none() {
            info!("Gamepad {} closed", self.device_path.display());
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use evdev::{AbsoluteAxisType, EventType, Key};
    use std::io;

    use crate::controller::mapper::{Button, InputCode};

    fn axis(axis: AbsoluteAxisType, value: i32) -> evdev::InputEvent {
        evdev::InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    fn key(key: Key, value: i32) -> evdev::InputEvent {
        evdev::InputEvent::new(EventType::KEY, key.code(), value)
    }

    fn sync() -> evdev::InputEvent {
        evdev::InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)
    }

    /// Replays `batches` through an [`EventQueue`] until it ends.
    fn drain(batches: Vec<io::Result<Vec<evdev::InputEvent>>>) -> (Vec<InputEvent>, usize) {
        let mut queue = EventQueue::new(EventMapper::new());
        let mut batches = VecDeque::from(batches);
        let mut fetches = 0;
        let mut events = Vec::new();

        while let Some(event) = queue.next_with(|| {
            fetches += 1;
            batches
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no more batches")))
        }) {
            events.push(event);
        }
        (events, fetches)
    }

    #[test]
    fn test_queue_hands_out_batch_in_order() {
        let (events, fetches) = drain(vec![Ok(vec![
            axis(AbsoluteAxisType::ABS_Y, -1000),
            key(Key::BTN_SOUTH, 1),
            sync(),
        ])]);

        assert_eq!(
            events,
            vec![
                InputEvent::new(InputCode::DriveLeft, -1000),
                InputEvent::new(InputCode::Button(Button::A), 1),
            ]
        );
        // One batch, then the failing fetch that ends the stream
        assert_eq!(fetches, 2);
    }

    #[test]
    fn test_queue_skips_unmapped_and_empty_batches() {
        let (events, _) = drain(vec![
            Ok(vec![sync()]),
            Ok(vec![]),
            Ok(vec![axis(AbsoluteAxisType::ABS_HAT0X, 1), sync()]),
            Ok(vec![axis(AbsoluteAxisType::ABS_RX, 250), sync()]),
        ]);

        assert_eq!(events, vec![InputEvent::new(InputCode::SteerFront, 250)]);
    }

    #[test]
    fn test_queue_drains_pending_before_fetching() {
        let (events, fetches) = drain(vec![
            Ok(vec![axis(AbsoluteAxisType::ABS_Z, 10), axis(AbsoluteAxisType::ABS_RZ, 20)]),
            Ok(vec![key(Key::BTN_EAST, 1)]),
        ]);

        assert_eq!(events.len(), 3);
        assert_eq!(events[2].code, InputCode::Button(Button::B));
        assert_eq!(fetches, 3);
    }

    #[test]
    fn test_queue_ends_on_read_error() {
        let (events, fetches) = drain(vec![
            Err(io::Error::new(io::ErrorKind::Other, "No such device")),
            Ok(vec![axis(AbsoluteAxisType::ABS_Y, 5)]),
        ]);

        assert!(events.is_empty());
        assert_eq!(fetches, 1);
    }

    #[test]
    fn test_open_missing_path() {
        let result = Gamepad::open("/dev/input/nonexistent_event_device", ControllerLayout::default());
        match result {
            Err(RcDriveError::Controller(msg)) => {
                assert!(msg.contains("/dev/input/nonexistent_event_device"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Controller error, got: {:?}", other),
        }
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_detect_with_real_hardware() {
        let gamepad = Gamepad::detect(ControllerLayout::default()).expect("No gamepad connected");
        assert!(gamepad.device_path().starts_with("/dev/input"));
        assert!(gamepad.name().is_some());

        let caps = gamepad.capabilities().expect("Failed to read capabilities");
        assert!(caps.max_stick_value > 0);
        assert!(caps.min_stick_value < 0);
        assert!(caps.max_trigger_value > 0);
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_events_with_real_hardware() {
        let gamepad = Gamepad::detect(ControllerLayout::default()).expect("No gamepad connected");

        println!("Move a stick or press A/B...");
        let event = gamepad.into_events().next();
        assert!(event.is_some(), "No events received from gamepad");
    }
}
