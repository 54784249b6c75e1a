//! Usage statistics and the daily rollover.
//!
//! Completed focus phases roll up into daily and weekly counters.
//! At each calendar boundary `today` is archived into a capped history
//! and the streak is recomputed. Rollover is keyed on the stored date,
//! so it is idempotent and any loader can perform it when the scheduled
//! midnight trigger was missed.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Oldest-first history, capped at this many day records.
pub const HISTORY_CAP: usize = 30;

/// Weekday whose rollover resets the weekly counter.
pub const WEEK_START: Weekday = Weekday::Sun;

/// One archived (or in-progress) day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub pomodoros: u32,
    /// Accumulated focus time in seconds.
    pub focus_secs: u64,
}

impl DayRecord {
    pub fn zeroed(date: NaiveDate) -> Self {
        Self {
            date,
            pomodoros: 0,
            focus_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekStats {
    pub pomodoros: u32,
}

/// Aggregated usage statistics, one of the fields of the persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub today: DayRecord,
    #[serde(default)]
    pub week: WeekStats,
    #[serde(default)]
    pub streak: u32,
    /// Past days, most-recent-last, at most [`HISTORY_CAP`] entries.
    #[serde(default)]
    pub history: Vec<DayRecord>,
}

impl Stats {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: DayRecord::zeroed(today),
            week: WeekStats::default(),
            streak: 0,
            history: Vec::new(),
        }
    }

    /// Daily boundary operation.
    ///
    /// No-op when `today` already carries the current date, which makes
    /// the operation idempotent across a scheduled trigger and any
    /// number of lazy loaders. Days without a single completed pomodoro
    /// are not archived and leave the streak untouched.
    ///
    /// Returns whether a rollover happened.
    pub fn rollover(&mut self, today: NaiveDate, daily_goal: u32) -> bool {
        if self.today.date == today {
            return false;
        }

        if self.today.pomodoros > 0 {
            self.history.push(self.today.clone());
            if self.history.len() > HISTORY_CAP {
                let excess = self.history.len() - HISTORY_CAP;
                self.history.drain(..excess);
            }
            if self.today.pomodoros >= daily_goal {
                self.streak += 1;
            } else {
                self.streak = 0;
            }
        }

        if today.weekday() == WEEK_START {
            self.week.pomodoros = 0;
        }

        self.today = DayRecord::zeroed(today);
        true
    }

    /// Zero today's counters without touching history or streak.
    pub fn reset_today(&mut self) {
        self.today.pomodoros = 0;
        self.today.focus_secs = 0;
    }

    /// Record one completed focus phase.
    pub fn record_pomodoro(&mut self) {
        self.today.pomodoros += 1;
        self.week.pomodoros += 1;
    }

    // ── Aggregates for observers ─────────────────────────────────────

    pub fn total_pomodoros(&self) -> u64 {
        u64::from(self.today.pomodoros)
            + self.history.iter().map(|d| u64::from(d.pomodoros)).sum::<u64>()
    }

    pub fn total_focus_secs(&self) -> u64 {
        self.today.focus_secs + self.history.iter().map(|d| d.focus_secs).sum::<u64>()
    }

    /// Average pomodoros per day with recorded activity, rounded.
    pub fn average_per_day(&self) -> u64 {
        let days = self.history.len() as u64 + u64::from(self.today.pomodoros > 0);
        if days == 0 {
            return 0;
        }
        (self.total_pomodoros() + days / 2) / days
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}
