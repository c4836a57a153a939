//! One-shot countdown that can be paused and resumed without losing time.
//!
//! The timer drives every phase transition of the round engine. Arming it
//! replaces any previous countdown. Pausing freezes the remaining duration;
//! while paused, an attached [`WindowControl`] is extended repeatedly so the
//! collection window's own wall-clock deadline cannot fire under the pause.
//! Resuming re-arms for exactly the frozen remainder, so the total armed
//! time before firing equals the scheduled delay regardless of how long the
//! pauses lasted.

use std::sync::{Mutex, MutexGuard};

use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::{Duration, Instant, sleep_until},
};
use tracing::debug;

use super::window::WindowControl;

/// Floor for the keeper tick so a pause near the deadline cannot spin.
const MIN_KEEPER_PERIOD: Duration = Duration::from_millis(50);

/// How a wait on the timer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The armed duration fully elapsed.
    Elapsed,
    /// The timer was cancelled (game aborted) before elapsing.
    Cancelled,
}

struct TimerState {
    remaining: Duration,
    /// `Some` while counting down; `None` while paused, fired, or idle.
    armed_at: Option<Instant>,
    cancelled: bool,
    window: Option<WindowControl>,
    /// Pause-time task that keeps extending the attached window.
    keeper: Option<JoinHandle<()>>,
}

/// Pausable one-shot timer; see the module docs for the contract.
pub struct PausableTimer {
    state: Mutex<TimerState>,
    notify: Notify,
}

impl Default for PausableTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PausableTimer {
    /// Create an idle timer.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TimerState {
                remaining: Duration::ZERO,
                armed_at: None,
                cancelled: false,
                window: None,
                keeper: None,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arm the timer for `delay`, replacing any previous countdown. When a
    /// window control is attached, a later pause will keep that window open.
    pub fn arm(&self, delay: Duration, window: Option<WindowControl>) {
        let mut state = self.lock();
        if let Some(keeper) = state.keeper.take() {
            keeper.abort();
        }
        state.remaining = delay;
        state.armed_at = Some(Instant::now());
        state.cancelled = false;
        state.window = window;
        self.notify.notify_waiters();
    }

    /// Freeze the countdown. No-op (returning `false`) when already paused,
    /// fired, or never armed, so a second pause cannot corrupt the remainder.
    pub fn pause(&self) -> bool {
        let mut state = self.lock();
        let Some(armed_at) = state.armed_at.take() else {
            return false;
        };
        state.remaining = state.remaining.saturating_sub(armed_at.elapsed());
        debug!(remaining_ms = state.remaining.as_millis() as u64, "timer paused");

        if let Some(window) = state.window.clone() {
            // The window deadline keeps running on wall-clock time, so keep
            // resetting it to the frozen remainder until we resume.
            let remaining = state.remaining;
            let period = (remaining / 2).max(MIN_KEEPER_PERIOD);
            state.keeper = Some(tokio::spawn(async move {
                let mut tick = tokio::time::interval(period);
                loop {
                    tick.tick().await;
                    window.extend(remaining);
                }
            }));
        }

        self.notify.notify_waiters();
        true
    }

    /// Re-arm for the frozen remainder. No-op (returning `false`) while the
    /// countdown is already running.
    pub fn resume(&self) -> bool {
        let mut state = self.lock();
        if state.armed_at.is_some() {
            return false;
        }
        if let Some(keeper) = state.keeper.take() {
            keeper.abort();
        }
        if let Some(window) = &state.window {
            // Line the window deadline up with the restarted countdown.
            window.extend(state.remaining);
        }
        state.armed_at = Some(Instant::now());
        debug!(remaining_ms = state.remaining.as_millis() as u64, "timer resumed");
        self.notify.notify_waiters();
        true
    }

    /// Cancel the countdown; pending and future waits return
    /// [`TimerOutcome::Cancelled`] until the timer is re-armed.
    pub fn cancel(&self) {
        let mut state = self.lock();
        if let Some(keeper) = state.keeper.take() {
            keeper.abort();
        }
        state.armed_at = None;
        state.cancelled = true;
        self.notify.notify_waiters();
    }

    /// Wait until the armed duration has fully elapsed (pauses excluded) or
    /// the timer is cancelled.
    pub async fn elapsed(&self) -> TimerOutcome {
        loop {
            let notified = self.notify.notified();
            let deadline = {
                let state = self.lock();
                if state.cancelled {
                    return TimerOutcome::Cancelled;
                }
                state.armed_at.map(|armed_at| armed_at + state.remaining)
            };
            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = sleep_until(deadline) => {
                            let mut state = self.lock();
                            if state.cancelled {
                                return TimerOutcome::Cancelled;
                            }
                            // A pause or re-arm may have shifted the target
                            // while we slept; only fire if it truly elapsed.
                            if let Some(armed_at) = state.armed_at
                                && Instant::now() >= armed_at + state.remaining
                            {
                                state.armed_at = None;
                                state.remaining = Duration::ZERO;
                                state.window = None;
                                return TimerOutcome::Elapsed;
                            }
                        }
                        _ = notified => {}
                    }
                }
                None => notified.await,
            }
        }
    }
}

impl Drop for PausableTimer {
    fn drop(&mut self) {
        if let Some(keeper) = self.lock().keeper.take() {
            keeper.abort();
        }
    }
}
