//! File-backed state store.
//!
//! One JSON record, read whole and written whole. Writers go through
//! [`StateStore::update`], a read-modify-write that heals time-based
//! conditions first and commits with an optimistic version check;
//! a lost race surfaces as [`StoreError::Conflict`] and is retried on a
//! fresh load. Observers receive committed snapshots on a watch
//! channel.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::clock::Clock;
use crate::error::{CoreError, Result, StoreError};
use crate::events::Event;

use super::data_dir;
use super::record::AppState;

/// Retries for an [`update`](StateStore::update) that keeps losing the
/// version race.
const MAX_COMMIT_RETRIES: usize = 5;

/// Result of a committed (or no-op) update.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    /// The record as it now stands in the store.
    pub state: AppState,
    /// Events produced by lazy healing during the load.
    pub heal_events: Vec<Event>,
    /// Whatever the mutation closure returned.
    pub output: T,
}

/// Sole owner of the persisted record.
///
/// Every component takes the store as an injected dependency and
/// reloads from it at the start of each logical operation; nothing
/// caches fields across operations.
pub struct StateStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    tx: watch::Sender<AppState>,
}

impl StateStore {
    /// Open a store at an explicit path, creating first-run defaults
    /// when no record exists yet.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.into();
        let (tx, _rx) = watch::channel(AppState::first_run(clock.today()));
        let store = Self { path, clock, tx };
        if store.path.exists() {
            // Heal whatever was left behind and seed the channel with it.
            let committed = store.update(|_| ())?;
            store.tx.send_replace(committed.state);
        } else {
            // First run: materialize defaults so observers never see a
            // missing record.
            let mut state = AppState::first_run(store.clock.today());
            store.save(&mut state)?;
        }
        Ok(store)
    }

    /// Open the store at `~/.config/focusgoals/state.json`.
    pub fn open_default(clock: Arc<dyn Clock>) -> Result<Self> {
        let path = data_dir()?.join("state.json");
        Self::open(path, clock)
    }

    /// Latest committed record with time-based conditions re-validated
    /// in memory. Healing here is not persisted; the next `update`
    /// commits it.
    pub fn snapshot(&self) -> Result<AppState> {
        let mut state = self.load_raw()?;
        state.heal(self.clock.now_ms(), self.clock.today());
        Ok(state)
    }

    /// Subscribe to committed snapshots. The receiver is seeded with
    /// the latest value.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Read-modify-write with lazy healing and conflict retry.
    ///
    /// Loads the record, heals it, applies `f`, and commits. A version
    /// conflict reloads and reapplies `f` on the fresh record, up to
    /// [`MAX_COMMIT_RETRIES`] times. When neither healing nor `f`
    /// changed anything, nothing is written and the version stays put.
    pub fn update<T>(&self, mut f: impl FnMut(&mut AppState) -> T) -> Result<Committed<T>> {
        let mut last_conflict = None;
        for _ in 0..MAX_COMMIT_RETRIES {
            let mut state = self.load_raw()?;
            let before = state.clone();
            let heal_events = state.heal(self.clock.now_ms(), self.clock.today());
            let output = f(&mut state);

            if state == before {
                return Ok(Committed {
                    state,
                    heal_events,
                    output,
                });
            }

            match self.save(&mut state) {
                Ok(()) => {
                    return Ok(Committed {
                        state,
                        heal_events,
                        output,
                    })
                }
                Err(CoreError::Store(conflict @ StoreError::Conflict { .. })) => {
                    debug!(path = %self.path.display(), "state version conflict, retrying");
                    last_conflict = Some(conflict);
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_conflict
            .map(CoreError::Store)
            .unwrap_or_else(|| StoreError::Corrupt("retry loop exhausted".into()).into()))
    }

    /// Write the full record back, compare-and-swap on the version
    /// stamp. Prefer [`update`](StateStore::update); this is the raw
    /// write-all half of the store contract.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when another writer committed since
    /// `state` was loaded.
    pub fn save(&self, state: &mut AppState) -> Result<()> {
        let current = self.load_raw()?;
        if current.version != state.version {
            return Err(StoreError::Conflict {
                expected: state.version,
                found: current.version,
            }
            .into());
        }
        state.version += 1;

        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes).map_err(|e| StoreError::WriteFailed {
            path: tmp.clone(),
            message: e.to_string(),
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::WriteFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        self.tx.send_replace(state.clone());
        Ok(())
    }

    /// Read the record as persisted. A missing file is first run, never
    /// an error.
    fn load_raw(&self) -> Result<AppState> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(e.to_string()).into()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok(AppState::first_run(self.clock.today()))
            }
            Err(e) => Err(StoreError::ReadFailed {
                path: self.path.clone(),
                message: e.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer;

    fn open_temp() -> (tempfile::TempDir, Arc<ManualClock>, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store =
            StateStore::open(dir.path().join("state.json"), clock.clone()).unwrap();
        (dir, clock, store)
    }

    #[test]
    fn open_materializes_first_run_defaults() {
        let (_dir, clock, store) = open_temp();
        let snap = store.snapshot().unwrap();
        assert_eq!(snap.timer.time_left_secs, 25 * 60);
        assert_eq!(snap.stats.today.date, clock.today());
        assert_eq!(snap.stats.today.pomodoros, 0);
        assert!(snap.version >= 1);
    }

    #[test]
    fn update_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let path = dir.path().join("state.json");

        let store = StateStore::open(&path, clock.clone()).unwrap();
        store
            .update(|s| {
                timer::toggle(&mut s.timer, &s.settings, &mut s.stats, 0);
            })
            .unwrap();

        let other = StateStore::open(&path, clock).unwrap();
        let snap = other.snapshot().unwrap();
        assert!(snap.timer.is_running);
    }

    #[test]
    fn noop_update_does_not_bump_version() {
        let (_dir, _clock, store) = open_temp();
        let v = store.snapshot().unwrap().version;
        let committed = store.update(|_| ()).unwrap();
        assert_eq!(committed.state.version, v);
    }

    #[test]
    fn save_detects_concurrent_commit() {
        let (_dir, _clock, store) = open_temp();
        let mut stale = store.snapshot().unwrap();

        store
            .update(|s| {
                s.settings.sound_enabled = false;
            })
            .unwrap();

        stale.settings.sound_enabled = true;
        let err = store.save(&mut stale);
        assert!(matches!(
            err,
            Err(CoreError::Store(StoreError::Conflict { .. }))
        ));
    }

    #[test]
    fn update_retries_past_a_conflict() {
        // The closure may run more than once; it must still converge.
        let (_dir, _clock, store) = open_temp();
        let mut calls = 0;
        let committed = store
            .update(|s| {
                calls += 1;
                s.stats.today.pomodoros += 1;
            })
            .unwrap();
        assert_eq!(committed.state.stats.today.pomodoros, 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn subscribers_see_committed_snapshots() {
        let (_dir, _clock, store) = open_temp();
        let mut rx = store.subscribe();

        store
            .update(|s| {
                s.settings.sound_enabled = false;
            })
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().settings.sound_enabled);
    }

    #[test]
    fn update_commits_lazy_healing() {
        let (_dir, clock, store) = open_temp();
        store
            .update(|s| {
                s.stats.today.pomodoros = 6;
            })
            .unwrap();

        clock.advance_ms(24 * 3600 * 1000);
        let committed = store.update(|_| ()).unwrap();
        assert!(committed
            .heal_events
            .iter()
            .any(|e| matches!(e, Event::StatsRolledOver { .. })));
        assert_eq!(committed.state.stats.streak, 1);

        // The healed record was persisted, not just observed.
        let snap = store.snapshot().unwrap();
        assert_eq!(snap.stats.today.pomodoros, 0);
        assert_eq!(snap.stats.streak, 1);
    }
}
