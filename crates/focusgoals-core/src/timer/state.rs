//! Persisted timer state.
//!
//! Remaining time is never stored as a countdown. While running, it is
//! derived from the banked `time_left_secs` minus the elapsed time since
//! `started_at_ms`, so the value stays correct however late or seldom
//! the host wakes us.

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Focus,
    Break,
}

/// Session timer state, one of the four fields of the persisted record.
///
/// Invariants: `is_running` implies `started_at_ms` is set;
/// `is_paused` implies not `is_running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: Mode,
    pub is_running: bool,
    pub is_paused: bool,
    /// Seconds banked on the current phase.
    pub time_left_secs: u64,
    /// Epoch ms when the current run started; `None` unless running.
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    /// Elapsed seconds of the current run already credited to today's
    /// focus time. Supports delta-based accounting across missed ticks.
    #[serde(default)]
    pub accounted_secs: u64,
}

impl TimerState {
    /// Fresh focus-idle state sized from settings.
    pub fn new(settings: &Settings) -> Self {
        Self {
            mode: Mode::Focus,
            is_running: false,
            is_paused: false,
            time_left_secs: settings.focus_secs(),
            started_at_ms: None,
            accounted_secs: 0,
        }
    }

    /// Whole seconds elapsed since the current run started. Zero when
    /// not running.
    pub fn elapsed_secs(&self, now_ms: u64) -> u64 {
        match self.started_at_ms {
            Some(start) => now_ms.saturating_sub(start) / 1000,
            None => 0,
        }
    }

    /// Live remaining time at `now_ms`, never negative.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        if self.is_running {
            self.time_left_secs.saturating_sub(self.elapsed_secs(now_ms))
        } else {
            self.time_left_secs
        }
    }

    /// Park the timer in the given mode with a full phase banked.
    pub(crate) fn park(&mut self, mode: Mode, settings: &Settings) {
        self.mode = mode;
        self.is_running = false;
        self.is_paused = false;
        self.time_left_secs = settings.phase_secs(mode);
        self.started_at_ms = None;
        self.accounted_secs = 0;
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}
