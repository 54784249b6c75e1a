//! Background engine.
//!
//! The engine is the glue between the coarse scheduler triggers and the
//! state machine: a ~1 s tick, a midnight trigger, and a one-shot
//! trigger at the emergency-override deadline. None of the triggers are
//! load-bearing for correctness -- every store update re-validates
//! time-based conditions -- so a host that suspends the loop only
//! delays notifications, never corrupts state.
//!
//! User-initiated mutations (toggle, skip, settings save, override
//! activation) are exposed as methods so UI surfaces funnel their
//! writes through the same store.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local, TimeZone, Utc};
use tracing::{info, warn};

use crate::blocklist;
use crate::clock::Clock;
use crate::emergency;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::settings::Settings;
use crate::storage::StateStore;
use crate::timer;

/// Nominal scheduler cadence.
pub const TICK_INTERVAL_SECS: u64 = 1;

/// Notification collaborator. Fire-and-forget; the core never consumes
/// a return value.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Notifier that drops everything. For headless hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}

/// Long-lived background engine.
///
/// Holds no session state of its own; every operation reloads from the
/// injected store.
pub struct Engine {
    store: Arc<StateStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl Engine {
    pub fn new(store: Arc<StateStore>, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    // ── User operations ──────────────────────────────────────────────

    /// Start or pause the session timer.
    pub fn toggle_timer(&self) -> Result<Event> {
        let now = self.clock.now_ms();
        let committed = self.store.update(|s| {
            timer::toggle(&mut s.timer, &s.settings, &mut s.stats, now)
        })?;
        self.announce(&committed.heal_events);
        Ok(committed.output)
    }

    /// Abandon the current break. `None` when not in break mode.
    pub fn skip_break(&self) -> Result<Option<Event>> {
        let now = self.clock.now_ms();
        let committed = self
            .store
            .update(|s| timer::skip_break(&mut s.timer, &s.settings, now))?;
        self.announce(&committed.heal_events);
        Ok(committed.output)
    }

    /// Suspend enforcement for the emergency window.
    ///
    /// # Errors
    ///
    /// [`CoreError::OverrideActive`] when a window is already open.
    pub fn activate_override(&self) -> Result<Event> {
        let now = self.clock.now_ms();
        let committed = self.store.update(|s| {
            emergency::activate(&mut s.timer, &mut s.stats, &mut s.emergency, now)
        })?;
        self.announce(&committed.heal_events);
        let event = committed.output?;
        info!(end_time_ms = ?event_end(&event), "emergency override activated");
        Ok(event)
    }

    /// Validate and persist new settings.
    ///
    /// Rejected input leaves the persisted record untouched.
    pub fn save_settings(&self, settings: Settings) -> Result<Event> {
        settings.validate().map_err(CoreError::Settings)?;
        let now = self.clock.now_ms();
        let committed = self.store.update(|s| {
            s.settings = settings.clone();
            Event::SettingsSaved {
                at: crate::events::at(now),
            }
        })?;
        self.announce(&committed.heal_events);
        Ok(committed.output)
    }

    /// Zero today's counters on user request.
    pub fn reset_today(&self) -> Result<Event> {
        let now = self.clock.now_ms();
        let committed = self.store.update(|s| {
            s.stats.reset_today();
            Event::TodayReset {
                at: crate::events::at(now),
            }
        })?;
        self.announce(&committed.heal_events);
        Ok(committed.output)
    }

    /// Classify a hostname against the current snapshot.
    pub fn is_blocked(&self, hostname: &str) -> Result<bool> {
        let now = self.clock.now_ms();
        let snap = self.store.snapshot()?;
        Ok(blocklist::is_blocked(
            hostname,
            &snap.settings.blocked_sites,
            snap.timer.mode,
            snap.timer.is_running,
            snap.override_active(now),
        ))
    }

    // ── Scheduler handlers ───────────────────────────────────────────

    /// Recurring ~1 s trigger: advance the session timer.
    pub fn handle_tick(&self) -> Result<Vec<Event>> {
        let now = self.clock.now_ms();
        let committed = self.store.update(|s| {
            timer::tick(&mut s.timer, &s.settings, &mut s.stats, now)
        })?;
        let mut events = committed.heal_events;
        events.extend(committed.output);
        self.announce(&events);
        Ok(events)
    }

    /// Midnight trigger: roll yesterday into history.
    ///
    /// The rollover itself runs inside the update's healing pass, so a
    /// missed trigger costs nothing.
    pub fn handle_midnight(&self) -> Result<Vec<Event>> {
        let committed = self.store.update(|_| ())?;
        self.announce(&committed.heal_events);
        Ok(committed.heal_events)
    }

    /// One-shot trigger at the override deadline: restore the session.
    ///
    /// Re-checks that the override is still present and due; a stale
    /// wake after a manual clear is a no-op.
    pub fn handle_override_deadline(&self) -> Result<Vec<Event>> {
        let committed = self.store.update(|_| ())?;
        self.announce(&committed.heal_events);
        Ok(committed.heal_events)
    }

    // ── Run loop ─────────────────────────────────────────────────────

    /// Drive the scheduler triggers until the task is dropped.
    ///
    /// Store errors are logged and the loop keeps going; the core
    /// degrades to its lazy checks rather than dying.
    pub async fn run(&self) {
        let mut tick = tokio::time::interval(Duration::from_secs(TICK_INTERVAL_SECS));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut midnight = Box::pin(tokio::time::sleep(self.until_next_midnight()));

        info!("background engine started");
        loop {
            let deadline_ms = match self.store.snapshot() {
                Ok(snap) => snap.emergency.as_ref().map(|ov| ov.end_time_ms),
                Err(e) => {
                    warn!(error = %e, "snapshot failed");
                    None
                }
            };
            let override_due = async {
                match deadline_ms {
                    Some(ms) => {
                        let now = self.clock.now_ms();
                        tokio::time::sleep(Duration::from_millis(ms.saturating_sub(now))).await;
                    }
                    None => pending::<()>().await,
                }
            };

            tokio::select! {
                _ = tick.tick() => {
                    if let Err(e) = self.handle_tick() {
                        warn!(error = %e, "tick failed");
                    }
                }
                _ = &mut midnight => {
                    if let Err(e) = self.handle_midnight() {
                        warn!(error = %e, "midnight rollover failed");
                    }
                    midnight = Box::pin(tokio::time::sleep(self.until_next_midnight()));
                }
                _ = override_due => {
                    if let Err(e) = self.handle_override_deadline() {
                        warn!(error = %e, "override expiry failed");
                    }
                }
            }
        }
    }

    fn until_next_midnight(&self) -> Duration {
        let now_ms = self.clock.now_ms();
        Duration::from_millis(next_midnight_ms(now_ms).saturating_sub(now_ms))
    }

    // ── Notifications ────────────────────────────────────────────────

    fn announce(&self, events: &[Event]) {
        for event in events {
            match event {
                Event::FocusCompleted { pomodoros_today, .. } => {
                    info!(pomodoros_today, "focus phase completed");
                    self.notifier.notify(
                        "Pomodoro complete!",
                        &format!(
                            "You've completed {pomodoros_today} pomodoro(s) today. Time for a break!"
                        ),
                    );
                }
                Event::BreakCompleted { .. } => {
                    info!("break phase completed");
                    self.notifier
                        .notify("Break finished!", "Ready for another focus session?");
                }
                Event::BlockingResumed { .. } => {
                    info!("emergency override expired");
                    self.notifier
                        .notify("Emergency window ended", "Timer restarted. Back to focus.");
                }
                Event::StatsRolledOver { date, .. } => {
                    info!(%date, "daily stats rolled over");
                }
                _ => {}
            }
        }
    }
}

/// Epoch ms of the next local midnight after `now_ms`.
fn next_midnight_ms(now_ms: u64) -> u64 {
    let now_local = Utc
        .timestamp_millis_opt(now_ms as i64)
        .single()
        .unwrap_or_else(Utc::now)
        .with_timezone(&Local);
    let next_day = now_local.date_naive() + Days::new(1);
    next_day
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|dt| dt.timestamp_millis().max(0) as u64)
        // DST gap at midnight: fall back to a plain 24 h hop.
        .unwrap_or(now_ms + 24 * 3600 * 1000)
}

fn event_end(event: &Event) -> Option<u64> {
    match event {
        Event::OverrideActivated { end_time_ms, .. } => Some(*end_time_ms),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::emergency::OVERRIDE_WINDOW_SECS;
    use crate::timer::Mode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<(String, String)>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) {
            self.0
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }

    impl RecordingNotifier {
        fn titles(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
        }
    }

    struct Rig {
        _dir: tempfile::TempDir,
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
        engine: Engine,
    }

    fn rig() -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(
            StateStore::open(dir.path().join("state.json"), clock.clone()).unwrap(),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = Engine::new(store, clock.clone(), notifier.clone());
        Rig {
            _dir: dir,
            clock,
            notifier,
            engine,
        }
    }

    fn snapshot(rig: &Rig) -> crate::storage::AppState {
        rig.engine.store.snapshot().unwrap()
    }

    #[test]
    fn tick_drives_a_focus_phase_to_completion() {
        let r = rig();
        r.engine.toggle_timer().unwrap();

        r.clock.advance_secs(10);
        r.engine.handle_tick().unwrap();
        assert_eq!(snapshot(&r).stats.today.focus_secs, 10);

        r.clock.advance_secs(25 * 60);
        let events = r.engine.handle_tick().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::FocusCompleted { .. })));

        let snap = snapshot(&r);
        assert_eq!(snap.timer.mode, Mode::Break);
        assert!(snap.timer.is_running);
        assert_eq!(snap.stats.today.pomodoros, 1);
        assert_eq!(r.notifier.titles(), vec!["Pomodoro complete!"]);
    }

    #[test]
    fn break_completion_waits_for_explicit_start() {
        let r = rig();
        r.engine.toggle_timer().unwrap();
        r.clock.advance_secs(25 * 60);
        r.engine.handle_tick().unwrap();

        r.clock.advance_secs(5 * 60);
        let events = r.engine.handle_tick().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::BreakCompleted { .. })));

        let snap = snapshot(&r);
        assert_eq!(snap.timer.mode, Mode::Focus);
        assert!(!snap.timer.is_running);
        assert_eq!(snap.timer.time_left_secs, 25 * 60);
    }

    #[test]
    fn override_blocks_nothing_and_expires_on_deadline() {
        let r = rig();
        r.engine.toggle_timer().unwrap();
        r.clock.advance_secs(60);

        assert!(r.engine.is_blocked("www.facebook.com").unwrap());
        r.engine.activate_override().unwrap();
        assert!(!r.engine.is_blocked("www.facebook.com").unwrap());

        assert!(matches!(
            r.engine.activate_override(),
            Err(CoreError::OverrideActive)
        ));

        r.clock.advance_secs(OVERRIDE_WINDOW_SECS);
        let events = r.engine.handle_override_deadline().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::BlockingResumed { .. })));

        let snap = snapshot(&r);
        assert!(snap.emergency.is_none());
        assert!(snap.timer.is_running);
        assert_eq!(snap.timer.time_left_secs, 25 * 60 - 60);
        assert!(r.engine.is_blocked("facebook.com").unwrap());
    }

    #[test]
    fn midnight_handler_rolls_over_and_resets_today() {
        let r = rig();
        r.engine
            .store
            .update(|s| {
                s.stats.today.pomodoros = 6;
                s.stats.today.focus_secs = 6 * 25 * 60;
            })
            .unwrap();

        r.clock.advance_ms(24 * 3600 * 1000);
        let events = r.engine.handle_midnight().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::StatsRolledOver { .. })));

        let snap = snapshot(&r);
        assert_eq!(snap.stats.today.pomodoros, 0);
        assert_eq!(snap.stats.streak, 1);
        assert_eq!(snap.stats.history.len(), 1);
    }

    #[test]
    fn save_settings_rejects_invalid_input_without_mutation() {
        let r = rig();
        let before = snapshot(&r);

        let mut bad = Settings::default();
        bad.focus_duration_min = 0;
        assert!(r.engine.save_settings(bad).is_err());
        assert_eq!(snapshot(&r), before);

        let mut good = Settings::default();
        good.focus_duration_min = 50;
        r.engine.save_settings(good).unwrap();
        assert_eq!(snapshot(&r).settings.focus_duration_min, 50);
    }

    #[test]
    fn reset_today_zeroes_counters_only() {
        let r = rig();
        r.engine
            .store
            .update(|s| {
                s.stats.today.pomodoros = 3;
                s.stats.today.focus_secs = 1000;
                s.stats.streak = 4;
            })
            .unwrap();

        r.engine.reset_today().unwrap();
        let snap = snapshot(&r);
        assert_eq!(snap.stats.today.pomodoros, 0);
        assert_eq!(snap.stats.today.focus_secs, 0);
        assert_eq!(snap.stats.streak, 4);
    }

    #[test]
    fn next_midnight_is_strictly_ahead_and_at_most_a_day() {
        let now = 1_700_000_000_000;
        let next = next_midnight_ms(now);
        assert!(next > now);
        assert!(next - now <= 24 * 3600 * 1000);
    }
}
