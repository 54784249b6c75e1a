//! # FocusGoals Core Library
//!
//! Core business logic for the FocusGoals focus timer: the session
//! state machine (focus → break → focus), daily/weekly statistics with
//! midnight rollover, the time-boxed emergency override, and the site
//! classifier that enforcement surfaces consult.
//!
//! ## Architecture
//!
//! - **Session state machine**: wall-clock-based; remaining time is
//!   always derived from an absolute start timestamp, so the caller may
//!   tick as late or as seldom as its host allows
//! - **State store**: one persisted JSON record (timer, settings,
//!   stats, override) with optimistic versioning and a watch channel
//!   for change notification
//! - **Lazy self-healing**: every load re-validates time-based
//!   conditions (override expiry, calendar rollover) instead of
//!   trusting scheduled triggers
//! - **Engine**: tokio-driven glue firing the ~1 s tick, the midnight
//!   trigger, and the one-shot override deadline
//!
//! ## Key Components
//!
//! - [`Engine`]: background driver and user-operation entry points
//! - [`StateStore`]: persistence and change notification
//! - [`TimerState`] / [`Stats`] / [`Settings`] / [`EmergencyOverride`]:
//!   the four fields of the persisted record

pub mod blocklist;
pub mod clock;
pub mod emergency;
pub mod engine;
pub mod error;
pub mod events;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod timer;

pub use blocklist::{is_blocked, normalize_host};
pub use clock::{Clock, ManualClock, SystemClock};
pub use emergency::{EmergencyOverride, OVERRIDE_WINDOW_SECS};
pub use engine::{Engine, Notifier, NullNotifier, TICK_INTERVAL_SECS};
pub use error::{CoreError, Result, SettingsError, StoreError};
pub use events::Event;
pub use settings::Settings;
pub use stats::{DayRecord, Stats, HISTORY_CAP};
pub use storage::{AppState, Committed, StateStore};
pub use timer::{Mode, TimerState};
