//! Abstraction over time sources.
//!
//! All timer arithmetic works on absolute epoch-millisecond timestamps
//! supplied by a [`Clock`], so the state machine stays correct across a
//! host that is suspended and resumed at arbitrary ticks. Production
//! code injects [`SystemClock`]; tests inject [`ManualClock`] and
//! advance it explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, NaiveDate, TimeZone, Utc};

/// Time source injected into the engine and state store.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current wall-clock time in milliseconds since UNIX epoch.
    fn now_ms(&self) -> u64;

    /// Current calendar date in the host's local timezone.
    ///
    /// Derived from [`now_ms`](Clock::now_ms) so a manual clock yields a
    /// consistent date.
    fn today(&self) -> NaiveDate {
        Utc.timestamp_millis_opt(self.now_ms() as i64)
            .single()
            .map(|dt| dt.with_timezone(&Local).date_naive())
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for deterministic tests and replay.
///
/// Time only moves when [`advance_ms`](ManualClock::advance_ms) or
/// [`set_ms`](ManualClock::set_ms) is called.
#[derive(Debug)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self(AtomicU64::new(start_ms))
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs * 1000);
    }

    pub fn set_ms(&self, ms: u64) {
        self.0.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
