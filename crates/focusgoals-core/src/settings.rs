//! User configuration.
//!
//! Settings live inside the single persisted record and are mutated
//! only through an explicit save. Validation rejects bad input before
//! any state is touched.

use serde::{Deserialize, Serialize};

use crate::blocklist::normalize_host;
use crate::error::SettingsError;
use crate::timer::Mode;

/// Sites blocked out of the box.
pub const DEFAULT_BLOCKED_SITES: [&str; 6] = [
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "youtube.com",
    "reddit.com",
    "tiktok.com",
];

/// User configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Focus phase length in minutes.
    #[serde(default = "default_focus_duration")]
    pub focus_duration_min: u32,
    /// Break phase length in minutes.
    #[serde(default = "default_break_duration")]
    pub break_duration_min: u32,
    /// Completed pomodoros per day needed to extend the streak.
    #[serde(default = "default_pomodoro_goal")]
    pub daily_pomodoro_goal: u32,
    /// Daily focus-time goal in hours.
    #[serde(default = "default_focus_goal")]
    pub daily_focus_goal_hours: u32,
    /// Normalized hostname patterns (lower-cased, scheme and `www.` stripped).
    #[serde(default = "default_blocked_sites")]
    pub blocked_sites: Vec<String>,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
}

fn default_focus_duration() -> u32 {
    25
}
fn default_break_duration() -> u32 {
    5
}
fn default_pomodoro_goal() -> u32 {
    6
}
fn default_focus_goal() -> u32 {
    3
}
fn default_blocked_sites() -> Vec<String> {
    DEFAULT_BLOCKED_SITES.iter().map(|s| s.to_string()).collect()
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_duration_min: default_focus_duration(),
            break_duration_min: default_break_duration(),
            daily_pomodoro_goal: default_pomodoro_goal(),
            daily_focus_goal_hours: default_focus_goal(),
            blocked_sites: default_blocked_sites(),
            sound_enabled: true,
        }
    }
}

impl Settings {
    pub fn focus_secs(&self) -> u64 {
        u64::from(self.focus_duration_min) * 60
    }

    pub fn break_secs(&self) -> u64 {
        u64::from(self.break_duration_min) * 60
    }

    /// Full duration of the given phase in seconds.
    pub fn phase_secs(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Focus => self.focus_secs(),
            Mode::Break => self.break_secs(),
        }
    }

    /// Check every invariant before a save is allowed to land.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint; the settings value is
    /// left untouched either way.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.focus_duration_min == 0 {
            return Err(SettingsError::InvalidValue {
                field: "focus_duration_min",
                message: "must be greater than zero".into(),
            });
        }
        if self.break_duration_min == 0 {
            return Err(SettingsError::InvalidValue {
                field: "break_duration_min",
                message: "must be greater than zero".into(),
            });
        }
        if self.daily_pomodoro_goal == 0 {
            return Err(SettingsError::InvalidValue {
                field: "daily_pomodoro_goal",
                message: "must be at least 1".into(),
            });
        }
        if self.daily_focus_goal_hours == 0 {
            return Err(SettingsError::InvalidValue {
                field: "daily_focus_goal_hours",
                message: "must be at least 1".into(),
            });
        }
        for site in &self.blocked_sites {
            if site.is_empty() || *site != normalize_entry(site) {
                return Err(SettingsError::InvalidSite(site.clone()));
            }
        }
        Ok(())
    }

    /// Normalize and append a blocked-site entry.
    ///
    /// # Errors
    ///
    /// Rejects entries that are empty after normalization, and exact
    /// duplicates of an existing entry.
    pub fn add_blocked_site(&mut self, raw: &str) -> Result<(), SettingsError> {
        let site = normalize_entry(raw);
        if site.is_empty() {
            return Err(SettingsError::InvalidSite(raw.to_string()));
        }
        if self.blocked_sites.iter().any(|s| *s == site) {
            return Err(SettingsError::DuplicateSite(site));
        }
        self.blocked_sites.push(site);
        Ok(())
    }

    /// Remove an entry. Returns whether anything was removed.
    pub fn remove_blocked_site(&mut self, raw: &str) -> bool {
        let site = normalize_entry(raw);
        let before = self.blocked_sites.len();
        self.blocked_sites.retain(|s| *s != site);
        self.blocked_sites.len() != before
    }
}

/// Normalize a user-supplied site entry: trim, lowercase, strip an
/// optional `http(s)://` scheme and a leading `www.`.
pub fn normalize_entry(raw: &str) -> String {
    let s = raw.trim().to_ascii_lowercase();
    let s = s.strip_prefix("https://").or_else(|| s.strip_prefix("http://")).unwrap_or(&s);
    normalize_host(s)
}
