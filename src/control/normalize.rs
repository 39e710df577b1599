//! # Normalizer
//!
//! Rescales raw evdev samples using the extrema the device reports.
//!
//! Sticks map onto `-1.0..=1.0` and triggers onto `0.0..=1.0` by plain
//! division. Nothing is clamped: the caller guarantees the raw value is within
//! the device range. A device that reports a zero extremum cannot be
//! normalized at all, which is why [`DeviceCapabilities::validate`] must be
//! checked once at startup.
//!
//! ```
//! use rc_drive::control::normalize::{normalize_stick, normalize_trigger};
//!
//! assert_eq!(normalize_stick(16384, 32768), 0.5);
//! assert_eq!(normalize_trigger(1023, 1023), 1.0);
//! ```

use crate::error::{RcDriveError, Result};

/// Axis extrema announced by the input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Largest raw stick value (e.g. 32767 for xpad).
    pub max_stick_value: i32,
    /// Smallest raw stick value (e.g. -32768 for xpad).
    pub min_stick_value: i32,
    /// Largest raw trigger value (e.g. 1023 or 255).
    pub max_trigger_value: i32,
}

impl DeviceCapabilities {
    /// Rejects capabilities that would make normalization divide by zero.
    ///
    /// # Errors
    ///
    /// Returns [`RcDriveError::Capability`] naming the first zero extremum.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_stick_value", self.max_stick_value),
            ("min_stick_value", self.min_stick_value),
            ("max_trigger_value", self.max_trigger_value),
        ] {
            if value == 0 {
                return Err(RcDriveError::Capability(format!("{name} is zero")));
            }
        }
        Ok(())
    }
}

/// Converts a raw stick sample to `-1.0..=1.0`.
#[must_use]
pub fn normalize_stick(raw: i32, max_raw: i32) -> f32 {
    raw as f32 / max_raw as f32
}

/// Converts a raw trigger sample to `0.0..=1.0`.
#[must_use]
pub fn normalize_trigger(raw: i32, max_raw: i32) -> f32 {
    raw as f32 / max_raw as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xpad() -> DeviceCapabilities {
        DeviceCapabilities {
            max_stick_value: 32767,
            min_stick_value: -32768,
            max_trigger_value: 1023,
        }
    }

    #[test]
    fn test_normalize_stick_extremes() {
        assert_eq!(normalize_stick(32767, 32767), 1.0);
        assert_eq!(normalize_stick(-32767, 32767), -1.0);
        assert_eq!(normalize_stick(0, 32767), 0.0);
    }

    #[test]
    fn test_normalize_stick_is_not_clamped() {
        // xpad reports -32768 as its minimum, one step past -max
        assert!(normalize_stick(-32768, 32767) < -1.0);
    }

    #[test]
    fn test_normalize_trigger_range() {
        assert_eq!(normalize_trigger(0, 255), 0.0);
        assert_eq!(normalize_trigger(255, 255), 1.0);
        assert!((normalize_trigger(128, 255) - 0.502).abs() < 0.001);
    }

    #[test]
    fn test_zero_max_is_not_finite() {
        assert!(!normalize_stick(100, 0).is_finite());
        assert!(normalize_trigger(0, 0).is_nan());
    }

    #[test]
    fn test_capabilities_valid() {
        assert!(xpad().validate().is_ok());
    }

    #[test]
    fn test_capabilities_zero_rejected() {
        let caps = DeviceCapabilities { max_trigger_value: 0, ..xpad() };
        match caps.validate() {
            Err(RcDriveError::Capability(msg)) => assert!(msg.contains("max_trigger_value")),
            other => panic!("Expected Capability error, got: {:?}", other),
        }

        let caps = DeviceCapabilities { max_stick_value: 0, ..xpad() };
        assert!(caps.validate().is_err());

        let caps = DeviceCapabilities { min_stick_value: 0, ..xpad() };
        assert!(caps.validate().is_err());
    }
}
