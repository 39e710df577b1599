//! # Haptics Module
//!
//! Short rumble pulses used as press feedback.
//!
//! Rumble goes through a second evdev handle on the same event node, so
//! timer callbacks can buzz the pad while the control thread is blocked
//! reading events from the first handle.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use evdev::{Device, FFEffect, FFEffectData, FFEffectKind, FFEffectType, FFReplay, FFTrigger};
use tracing::{debug, warn};

use crate::error::{RcDriveError, Result};

/// Fire-and-forget force feedback.
pub trait Haptics: Send + Sync {
    /// Rumbles for `duration_ms`. Failures are logged, never reported.
    fn rumble(&self, duration_ms: u16);
}

/// Haptics for pads without force feedback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn rumble(&self, duration_ms: u16) {
        debug!("Rumble ({}ms) skipped, device has no force feedback", duration_ms);
    }
}

struct RumbleDevice {
    device: Device,
    // Uploaded effects are erased on drop, keep the last one alive
    effect: Option<FFEffect>,
}

/// evdev force-feedback rumble.
pub struct EvdevHaptics {
    inner: Mutex<RumbleDevice>,
    strength: u16,
}

impl std::fmt::Debug for EvdevHaptics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevHaptics")
            .field("strength", &self.strength)
            .finish_non_exhaustive()
    }
}

impl EvdevHaptics {
    /// Opens the event node for rumble output.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be opened or does not support
    /// `FF_RUMBLE`.
    pub fn open<P: AsRef<Path>>(path: P, strength: u16) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path).map_err(|e| {
            RcDriveError::Controller(format!("Failed to open {} for rumble: {}", path.display(), e))
        })?;

        let supports_rumble = device
            .supported_ff()
            .map_or(false, |ff| ff.contains(FFEffectType::FF_RUMBLE));
        if !supports_rumble {
            return Err(RcDriveError::Controller(format!(
                "{} does not support rumble",
                path.display()
            )));
        }

        Ok(Self {
            inner: Mutex::new(RumbleDevice { device, effect: None }),
            strength,
        })
    }

    fn play(&self, duration_ms: u16) -> std::io::Result<()> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let inner = &mut *guard;

        let data = FFEffectData {
            direction: 0,
            trigger: FFTrigger { button: 0, interval: 0 },
            replay: FFReplay { length: duration_ms, delay: 0 },
            kind: FFEffectKind::Rumble {
                strong_magnitude: self.strength,
                weak_magnitude: self.strength,
            },
        };

        let mut effect = inner.device.upload_ff_effect(data)?;
        effect.play(1)?;
        inner.effect = Some(effect);
        Ok(())
    }
}

impl Haptics for EvdevHaptics {
    fn rumble(&self, duration_ms: u16) {
        match self.play(duration_ms) {
            Ok(()) => debug!("Rumble {}ms", duration_ms),
            Err(e) => warn!("Rumble failed: {}", e),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_haptics_is_silent() {
        NoHaptics.rumble(200);
    }

    #[test]
    fn test_open_missing_device() {
        let result = EvdevHaptics::open("/dev/input/nonexistent_event_device", 0xc000);
        match result {
            Err(RcDriveError::Controller(msg)) => assert!(msg.contains("nonexistent_event_device")),
            other => panic!("Expected Controller error, got: {:?}", other),
        }
    }
}
