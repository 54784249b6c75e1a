mod record;
mod store;

pub use record::AppState;
pub use store::{Committed, StateStore};

use std::path::PathBuf;

/// Returns `~/.config/focusgoals[-dev]/` based on FOCUSGOALS_ENV.
///
/// Set FOCUSGOALS_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSGOALS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusgoals-dev")
    } else {
        base_dir.join("focusgoals")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
