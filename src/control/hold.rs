//! # Hold Timer
//!
//! Long-press detection for one button.
//!
//! ```text
//!            press                 threshold elapsed
//!   Idle ───────────▶ Armed ──────────────────────────▶ Fired ──▶ Idle
//!     ▲                 │                              (action runs once)
//!     └──── release ────┘
//! ```
//!
//! A press rumbles the pad and spawns a countdown task on the tokio runtime.
//! The phase and the countdown handle live behind one mutex shared with that
//! task. Release and expiry both transition under the lock, so exactly one of
//! them wins. Each arming gets a new generation number; a countdown that wakes
//! to find a different generation (or no longer `Armed`) does nothing, which
//! makes a late wake-up after cancellation harmless.
//!
//! Firing does not wait for the button to be released; the timer is `Idle`
//! again as soon as the action returns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::controller::haptics::Haptics;

/// Raw key value for a press.
pub const KEY_PRESSED: i32 = 1;
/// Raw key value for a release.
pub const KEY_RELEASED: i32 = 0;

/// Action run when a hold completes.
pub type HoldAction = Arc<dyn Fn() + Send + Sync>;

/// Observable phase of a [`HoldTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPhase {
    Idle,
    Armed,
    Fired,
}

enum State {
    Idle,
    Armed { generation: u64, countdown: AbortHandle },
    Fired,
}

struct Shared {
    state: State,
    generation: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Press-and-hold detector for a single button.
pub struct HoldTimer {
    label: &'static str,
    threshold: Duration,
    action: HoldAction,
    haptics: Arc<dyn Haptics>,
    rumble_ms: u16,
    runtime: Handle,
    shared: Arc<Mutex<Shared>>,
}

impl std::fmt::Debug for HoldTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoldTimer")
            .field("label", &self.label)
            .field("threshold", &self.threshold)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl HoldTimer {
    /// Creates an idle timer.
    ///
    /// * `label` - Name used in log messages
    /// * `threshold` - How long the button must stay down
    /// * `action` - Run once per completed hold, on a runtime worker
    /// * `haptics` / `rumble_ms` - Press feedback
    /// * `runtime` - Where countdown tasks are spawned
    #[must_use]
    pub fn new(
        label: &'static str,
        threshold: Duration,
        action: HoldAction,
        haptics: Arc<dyn Haptics>,
        rumble_ms: u16,
        runtime: Handle,
    ) -> Self {
        Self {
            label,
            threshold,
            action,
            haptics,
            rumble_ms,
            runtime,
            shared: Arc::new(Mutex::new(Shared {
                state: State::Idle,
                generation: 0,
            })),
        }
    }

    #[must_use]
    pub fn phase(&self) -> HoldPhase {
        match lock(&self.shared).state {
            State::Idle => HoldPhase::Idle,
            State::Armed { .. } => HoldPhase::Armed,
            State::Fired => HoldPhase::Fired,
        }
    }

    /// Feeds a raw key value (1 = press, 0 = release). Autorepeat is ignored.
    pub fn on_event(&self, value: i32) {
        match value {
            KEY_PRESSED => self.press(),
            KEY_RELEASED => {
                self.cancel();
            }
            _ => {}
        }
    }

    fn press(&self) {
        {
            let mut shared = lock(&self.shared);
            if !matches!(shared.state, State::Idle) {
                debug!("{} pressed while not idle, ignoring", self.label);
                return;
            }

            shared.generation += 1;
            let generation = shared.generation;
            let countdown = self
                .runtime
                .spawn(countdown(
                    Arc::clone(&self.shared),
                    generation,
                    self.threshold,
                    Arc::clone(&self.action),
                    self.label,
                ))
                .abort_handle();
            shared.state = State::Armed { generation, countdown };
        }

        debug!("{} armed for {:?}", self.label, self.threshold);
        self.haptics.rumble(self.rumble_ms);
    }

    /// Disarms a pending countdown.
    ///
    /// Returns `true` if a countdown was pending; its action can no longer
    /// run. `false` means nothing was armed or the hold already fired.
    pub fn cancel(&self) -> bool {
        let mut shared = lock(&self.shared);
        if !matches!(shared.state, State::Armed { .. }) {
            return false;
        }

        if let State::Armed { countdown, .. } = std::mem::replace(&mut shared.state, State::Idle) {
            countdown.abort();
        }
        debug!("{} released before threshold", self.label);
        true
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn countdown(
    shared: Arc<Mutex<Shared>>,
    generation: u64,
    threshold: Duration,
    action: HoldAction,
    label: &'static str,
) {
    tokio::time::sleep(threshold).await;

    {
        let mut guard = lock(&shared);
        match guard.state {
            State::Armed { generation: armed, .. } if armed == generation => {
                guard.state = State::Fired;
            }
            _ => return,
        }
    }

    info!("{} held for {:?}, firing", label, threshold);
    action();

    let mut guard = lock(&shared);
    if matches!(guard.state, State::Fired) {
        guard.state = State::Idle;
    }
}
