//! Emergency override.
//!
//! A user-triggered, time-boxed suspension of enforcement. Activation
//! freezes the session behind a snapshot; expiry restores the snapshot
//! running from exactly where it left off. The scheduled expiry trigger
//! is advisory only: every read path calls [`expire_if_due`], so a host
//! that never wakes the one-shot timer still heals on the next load.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::events::{at, Event};
use crate::stats::Stats;
use crate::timer::{Mode, TimerState};

/// Length of the override window.
pub const OVERRIDE_WINDOW_SECS: u64 = 5 * 60;

/// Persisted override record. Present in the store only while active;
/// removed on expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyOverride {
    /// Absolute expiry timestamp (epoch ms).
    pub end_time_ms: u64,
    /// Session snapshot taken at activation, elapsed time folded in.
    pub paused_timer: TimerState,
}

impl EmergencyOverride {
    pub fn expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.end_time_ms
    }

    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        self.end_time_ms.saturating_sub(now_ms) / 1000
    }
}

/// Suspend enforcement for [`OVERRIDE_WINDOW_SECS`].
///
/// Folds live elapsed time into the timer (crediting focus stats on the
/// way) so the snapshot carries the true remaining time, pauses the
/// session, and installs the override record.
///
/// # Errors
///
/// Fails with [`CoreError::OverrideActive`] when an override is already
/// running; nothing is mutated in that case.
pub fn activate(
    timer: &mut TimerState,
    stats: &mut Stats,
    slot: &mut Option<EmergencyOverride>,
    now_ms: u64,
) -> Result<Event, CoreError> {
    if slot.is_some() {
        return Err(CoreError::OverrideActive);
    }

    if timer.is_running {
        if timer.mode == Mode::Focus {
            let elapsed = timer.elapsed_secs(now_ms).min(timer.time_left_secs);
            stats.today.focus_secs += elapsed.saturating_sub(timer.accounted_secs);
        }
        timer.time_left_secs = timer.remaining_at(now_ms);
    }
    timer.is_running = false;
    timer.is_paused = true;
    timer.started_at_ms = None;
    timer.accounted_secs = 0;

    let end_time_ms = now_ms + OVERRIDE_WINDOW_SECS * 1000;
    *slot = Some(EmergencyOverride {
        end_time_ms,
        paused_timer: timer.clone(),
    });
    Ok(Event::OverrideActivated {
        end_time_ms,
        at: at(now_ms),
    })
}

/// Restore the session when the override window has elapsed.
///
/// Called both by the scheduled one-shot trigger and lazily by every
/// load. Re-checks presence and expiry before acting, so a stale wake
/// after a manual clear cannot re-apply outdated snapshot data.
pub fn expire_if_due(
    timer: &mut TimerState,
    slot: &mut Option<EmergencyOverride>,
    now_ms: u64,
) -> Option<Event> {
    let active = slot.as_ref()?;
    if !active.expired_at(now_ms) {
        return None;
    }
    let snapshot = slot.take()?;

    // Resume from where the session left off, not the full duration.
    *timer = snapshot.paused_timer;
    timer.is_running = true;
    timer.is_paused = false;
    timer.started_at_ms = Some(now_ms);
    timer.accounted_secs = 0;

    Some(Event::BlockingResumed {
        remaining_secs: timer.time_left_secs,
        at: at(now_ms),
    })
}
