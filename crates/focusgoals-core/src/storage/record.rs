//! The single persisted record.
//!
//! Everything the system remembers lives in one JSON blob: timer state,
//! settings, stats, and the optional emergency override. Observers read
//! it whole and writers replace it whole; the `version` stamp turns
//! last-write-wins into an optimistic compare-and-swap.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::emergency::{self, EmergencyOverride};
use crate::events::{at, Event};
use crate::settings::Settings;
use crate::stats::Stats;
use crate::timer::TimerState;

/// The full persisted state record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Optimistic concurrency stamp, bumped on every committed write.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub timer: TimerState,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub emergency: Option<EmergencyOverride>,
}

impl AppState {
    /// First-run record: focus-idle timer, default settings, empty
    /// stats stamped with today's date.
    pub fn first_run(today: NaiveDate) -> Self {
        let settings = Settings::default();
        Self {
            version: 0,
            timer: TimerState::new(&settings),
            settings,
            stats: Stats::new(today),
            emergency: None,
        }
    }

    /// Whether the emergency override is live at `now_ms`.
    ///
    /// Checks the expiry timestamp, not mere presence: a record whose
    /// window has passed no longer suspends enforcement even before a
    /// loader removes it.
    pub fn override_active(&self, now_ms: u64) -> bool {
        self.emergency
            .as_ref()
            .is_some_and(|ov| !ov.expired_at(now_ms))
    }

    /// Re-validate every time-based condition.
    ///
    /// Performed by each loader rather than trusting scheduled
    /// triggers: an override past its `end_time` expires and restores
    /// the session, and a `today` stamped with an old date rolls over.
    /// Returns the events produced, oldest first.
    pub fn heal(&mut self, now_ms: u64, today: NaiveDate) -> Vec<Event> {
        let mut events = Vec::new();
        if let Some(ev) = emergency::expire_if_due(&mut self.timer, &mut self.emergency, now_ms) {
            events.push(ev);
        }
        if self
            .stats
            .rollover(today, self.settings.daily_pomodoro_goal)
        {
            events.push(Event::StatsRolledOver {
                date: today,
                at: at(now_ms),
            });
        }
        events
    }
}
