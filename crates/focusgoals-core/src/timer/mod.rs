mod machine;
mod state;

pub use machine::{complete_phase, skip_break, tick, toggle};
pub use state::{Mode, TimerState};
