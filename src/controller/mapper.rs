//! # Controller Input Mapper Module
//!
//! Translates raw evdev events from an Xbox-style gamepad (Linux `xpad`
//! driver) into the fixed [`InputCode`] vocabulary the control loop acts on.
//!
//! ## Axis Assignments
//!
//! | Input | evdev Code | Range (xpad) | Function |
//! |-------|------------|--------------|----------|
//! | Left Stick Y | ABS_Y | -32768..32767 | Left motor |
//! | Right Stick Y | ABS_RY | -32768..32767 | Right motor |
//! | Right Stick X | ABS_RX | -32768..32767 | Front steering |
//! | Left Stick X | ABS_X | -32768..32767 | Rear steering |
//! | LT | ABS_Z | 0..1023 | Left motor brake |
//! | RT | ABS_RZ | 0..1023 | Right motor brake |
//!
//! Each motor and each steering servo reads its own physical axis.
//!
//! ## Button Assignments
//!
//! | Button | evdev Code | Function |
//! |--------|------------|----------|
//! | Start | BTN_START | Hold: reboot host |
//! | Back | BTN_SELECT | Hold: shut down host |
//! | A | BTN_SOUTH | Store steering trim |
//! | B | BTN_EAST | Restart control loop |
//!
//! ## Usage
//!
//! ```
//! use evdev::{AbsoluteAxisType, EventType};
//! use rc_drive::controller::mapper::{EventMapper, InputCode};
//!
//! let mapper = EventMapper::new();
//! let raw = evdev::InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_Y.0, -32767);
//!
//! let event = mapper.translate(&raw).unwrap();
//! assert_eq!(event.code, InputCode::DriveLeft);
//! assert_eq!(event.value, -32767);
//! ```

use evdev::{AbsoluteAxisType, InputEventKind, Key};

/// Named buttons the control loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Start,
    Back,
    A,
    B,
}

/// Input vocabulary of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCode {
    DriveLeft,
    DriveRight,
    SteerFront,
    SteerRear,
    TriggerLeft,
    TriggerRight,
    Button(Button),
}

/// One event in the control vocabulary with its raw device value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub code: InputCode,
    pub value: i32,
}

impl InputEvent {
    #[must_use]
    pub fn new(code: InputCode, value: i32) -> Self {
        Self { code, value }
    }
}

/// Physical axis and key assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerLayout {
    pub drive_left: AbsoluteAxisType,
    pub drive_right: AbsoluteAxisType,
    pub steer_front: AbsoluteAxisType,
    pub steer_rear: AbsoluteAxisType,
    pub trigger_left: AbsoluteAxisType,
    pub trigger_right: AbsoluteAxisType,
    pub start: Key,
    pub back: Key,
    pub a: Key,
    pub b: Key,
}

impl Default for ControllerLayout {
    /// Xbox 360 / One layout as exposed by the `xpad` driver.
    fn default() -> Self {
        Self {
            drive_left: AbsoluteAxisType::ABS_Y,
            drive_right: AbsoluteAxisType::ABS_RY,
            steer_front: AbsoluteAxisType::ABS_RX,
            steer_rear: AbsoluteAxisType::ABS_X,
            trigger_left: AbsoluteAxisType::ABS_Z,
            trigger_right: AbsoluteAxisType::ABS_RZ,
            start: Key::BTN_START,
            back: Key::BTN_SELECT,
            a: Key::BTN_SOUTH,
            b: Key::BTN_EAST,
        }
    }
}

/// Maps evdev events onto [`InputEvent`]s.
///
/// Stateless: each raw event translates independently.
#[derive(Debug, Clone, Default)]
pub struct EventMapper {
    layout: ControllerLayout,
}

impl EventMapper {
    /// Creates a mapper for the default `xpad` layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_layout(layout: ControllerLayout) -> Self {
        Self { layout }
    }

    #[must_use]
    pub fn layout(&self) -> &ControllerLayout {
        &self.layout
    }

    /// Translates a raw event, or `None` for anything outside the vocabulary
    /// (sync reports, d-pad, unmapped buttons).
    #[must_use]
    pub fn translate(&self, event: &evdev::InputEvent) -> Option<InputEvent> {
        let code = match event.kind() {
            InputEventKind::AbsAxis(axis) => self.axis_code(axis)?,
            InputEventKind::Key(key) => InputCode::Button(self.button(key)?),
            _ => return None,
        };
        Some(InputEvent::new(code, event.value()))
    }

    fn axis_code(&self, axis: AbsoluteAxisType) -> Option<InputCode> {
        let layout = &self.layout;
        let code = if axis == layout.drive_left {
            InputCode::DriveLeft
        } else if axis == layout.drive_right {
            InputCode::DriveRight
        } else if axis == layout.steer_front {
            InputCode::SteerFront
        } else if axis == layout.steer_rear {
            InputCode::SteerRear
        } else if axis == layout.trigger_left {
            InputCode::TriggerLeft
        } else if axis == layout.trigger_right {
            InputCode::TriggerRight
        } else {
            return None;
        };
        Some(code)
    }

    fn button(&self, key: Key) -> Option<Button> {
        let layout = &self.layout;
        let button = if key == layout.start {
            Button::Start
        } else if key == layout.back {
            Button::Back
        } else if key == layout.a {
            Button::A
        } else if key == layout.b {
            Button::B
        } else {
            return None;
        };
        Some(button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    /// Helper to create an axis event for testing.
    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> evdev::InputEvent {
        evdev::InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    /// Helper to create a key event for testing.
    fn make_key_event(key: Key, value: i32) -> evdev::InputEvent {
        evdev::InputEvent::new(EventType::KEY, key.code(), value)
    }

    #[test]
    fn test_axes_map_to_distinct_codes() {
        let mapper = EventMapper::new();
        let cases = [
            (AbsoluteAxisType::ABS_Y, InputCode::DriveLeft),
            (AbsoluteAxisType::ABS_RY, InputCode::DriveRight),
            (AbsoluteAxisType::ABS_RX, InputCode::SteerFront),
            (AbsoluteAxisType::ABS_X, InputCode::SteerRear),
            (AbsoluteAxisType::ABS_Z, InputCode::TriggerLeft),
            (AbsoluteAxisType::ABS_RZ, InputCode::TriggerRight),
        ];

        for (axis, expected) in cases {
            let event = mapper.translate(&make_axis_event(axis, 1234)).unwrap();
            assert_eq!(event, InputEvent::new(expected, 1234), "axis {:?}", axis);
        }
    }

    #[test]
    fn test_buttons() {
        let mapper = EventMapper::new();
        let cases = [
            (Key::BTN_START, Button::Start),
            (Key::BTN_SELECT, Button::Back),
            (Key::BTN_SOUTH, Button::A),
            (Key::BTN_EAST, Button::B),
        ];

        for (key, expected) in cases {
            let pressed = mapper.translate(&make_key_event(key, 1)).unwrap();
            assert_eq!(pressed, InputEvent::new(InputCode::Button(expected), 1));

            let released = mapper.translate(&make_key_event(key, 0)).unwrap();
            assert_eq!(released.value, 0);
        }
    }

    #[test]
    fn test_unmapped_inputs_ignored() {
        let mapper = EventMapper::new();
        assert!(mapper.translate(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, 1)).is_none());
        assert!(mapper.translate(&make_key_event(Key::BTN_NORTH, 1)).is_none());
        assert!(mapper.translate(&make_key_event(Key::BTN_MODE, 1)).is_none());

        let sync = evdev::InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert!(mapper.translate(&sync).is_none());
    }

    #[test]
    fn test_custom_layout() {
        let layout = ControllerLayout {
            trigger_left: AbsoluteAxisType::ABS_BRAKE,
            trigger_right: AbsoluteAxisType::ABS_GAS,
            ..ControllerLayout::default()
        };
        let mapper = EventMapper::with_layout(layout);

        let event = mapper.translate(&make_axis_event(AbsoluteAxisType::ABS_GAS, 255)).unwrap();
        assert_eq!(event.code, InputCode::TriggerRight);
        assert!(mapper.translate(&make_axis_event(AbsoluteAxisType::ABS_Z, 255)).is_none());
        assert_eq!(mapper.layout().trigger_left, AbsoluteAxisType::ABS_BRAKE);
    }
}
