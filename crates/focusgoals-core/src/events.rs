use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Mode;

/// Every state change in the system produces an Event.
/// Observers re-render from the store snapshot; the engine translates
/// a subset of these into user-facing notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        mode: Mode,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Break abandoned by the user; no stats effect.
    BreakSkipped {
        at: DateTime<Utc>,
    },
    /// A focus phase ran to zero. The session auto-continues into a
    /// running break.
    FocusCompleted {
        pomodoros_today: u32,
        at: DateTime<Utc>,
    },
    /// A break phase ran to zero. The session parks in focus-idle and
    /// waits for an explicit start.
    BreakCompleted {
        at: DateTime<Utc>,
    },
    /// Emergency override engaged; enforcement suspended until `end_time_ms`.
    OverrideActivated {
        end_time_ms: u64,
        at: DateTime<Utc>,
    },
    /// Emergency override window elapsed; the snapshotted session is
    /// running again.
    BlockingResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Daily boundary crossed; `today` was re-stamped (and possibly
    /// archived into history).
    StatsRolledOver {
        date: NaiveDate,
        at: DateTime<Utc>,
    },
    SettingsSaved {
        at: DateTime<Utc>,
    },
    /// Today's counters zeroed on user request.
    TodayReset {
        at: DateTime<Utc>,
    },
}

/// Event timestamp from an epoch-millisecond clock reading.
pub(crate) fn at(now_ms: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(now_ms as i64)
        .single()
        .unwrap_or_else(Utc::now)
}
