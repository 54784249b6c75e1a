//! Session state machine transitions.
//!
//! Pure functions over borrowed state: the caller loads the persisted
//! record, applies a transition with an explicit `now_ms`, and writes
//! the record back. No wall-clock reads happen here, which keeps every
//! transition deterministic under test.

use crate::events::{at, Event};
use crate::settings::Settings;
use crate::stats::Stats;

use super::state::{Mode, TimerState};

/// Start or pause the timer.
///
/// Pausing folds elapsed time into the bank and credits any focus
/// seconds not yet accounted. Starting from a spent phase
/// (`time_left_secs == 0`) re-banks the full duration first.
pub fn toggle(
    timer: &mut TimerState,
    settings: &Settings,
    stats: &mut Stats,
    now_ms: u64,
) -> Event {
    if timer.is_running {
        credit_focus_time(timer, stats, now_ms);
        let remaining = timer.remaining_at(now_ms);
        timer.time_left_secs = remaining;
        timer.is_running = false;
        timer.is_paused = true;
        timer.started_at_ms = None;
        timer.accounted_secs = 0;
        Event::TimerPaused {
            remaining_secs: remaining,
            at: at(now_ms),
        }
    } else {
        if timer.time_left_secs == 0 {
            timer.time_left_secs = settings.phase_secs(timer.mode);
        }
        timer.is_running = true;
        timer.is_paused = false;
        timer.started_at_ms = Some(now_ms);
        timer.accounted_secs = 0;
        Event::TimerStarted {
            mode: timer.mode,
            duration_secs: timer.time_left_secs,
            at: at(now_ms),
        }
    }
}

/// Abandon the current break and park in focus-idle.
///
/// Valid only while in break mode; the abandoned break has no stats
/// effect. Returns `None` outside break mode.
pub fn skip_break(
    timer: &mut TimerState,
    settings: &Settings,
    now_ms: u64,
) -> Option<Event> {
    if timer.mode != Mode::Break {
        return None;
    }
    timer.park(Mode::Focus, settings);
    Some(Event::BreakSkipped { at: at(now_ms) })
}

/// Periodic progress check. No-op unless running.
///
/// While a focus phase runs, today's focus time accumulates by the true
/// elapsed delta since the last accounted tick, so missed or late ticks
/// never lose seconds. When the phase has run to zero, completes it.
pub fn tick(
    timer: &mut TimerState,
    settings: &Settings,
    stats: &mut Stats,
    now_ms: u64,
) -> Option<Event> {
    if !timer.is_running {
        return None;
    }
    if timer.elapsed_secs(now_ms) >= timer.time_left_secs {
        return Some(complete_phase(timer, settings, stats, now_ms));
    }
    credit_focus_time(timer, stats, now_ms);
    None
}

/// Phase completion.
///
/// Focus completion counts a pomodoro and auto-continues into a running
/// break (rest should be frictionless). Break completion parks in
/// focus-idle and waits for an explicit start (restarting the blocking
/// phase should not be).
pub fn complete_phase(
    timer: &mut TimerState,
    settings: &Settings,
    stats: &mut Stats,
    now_ms: u64,
) -> Event {
    match timer.mode {
        Mode::Focus => {
            // Credit the tail of the phase that no tick accounted yet.
            let tail = timer.time_left_secs.saturating_sub(timer.accounted_secs);
            stats.today.focus_secs += tail;
            stats.record_pomodoro();

            timer.mode = Mode::Break;
            timer.time_left_secs = settings.break_secs();
            timer.is_running = true;
            timer.is_paused = false;
            timer.started_at_ms = Some(now_ms);
            timer.accounted_secs = 0;
            Event::FocusCompleted {
                pomodoros_today: stats.today.pomodoros,
                at: at(now_ms),
            }
        }
        Mode::Break => {
            timer.park(Mode::Focus, settings);
            Event::BreakCompleted { at: at(now_ms) }
        }
    }
}

/// Credit un-accounted elapsed focus seconds to today's focus time.
/// Capped at the banked phase length so an overdue completion cannot
/// over-credit.
fn credit_focus_time(timer: &mut TimerState, stats: &mut Stats, now_ms: u64) {
    if timer.mode != Mode::Focus || !timer.is_running {
        return;
    }
    let elapsed = timer.elapsed_secs(now_ms).min(timer.time_left_secs);
    stats.today.focus_secs += elapsed.saturating_sub(timer.accounted_secs);
    timer.accounted_secs = elapsed;
}
