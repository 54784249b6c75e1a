//! Core error types for focusgoals-core.
//!
//! This module defines the error hierarchy using thiserror. No condition
//! in the core is fatal to a host process: missing state defaults, stale
//! overrides expire silently, and only invalid user input surfaces as an
//! error to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusgoals-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// State store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Settings validation errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Emergency override activation while one is already running
    #[error("Emergency override is already active")]
    OverrideActive,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// State-store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read the persisted record
    #[error("Failed to read state at {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    /// Failed to write the persisted record
    #[error("Failed to write state at {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    /// The record exists but cannot be parsed
    #[error("State record is corrupt: {0}")]
    Corrupt(String),

    /// Optimistic write lost the race against another writer
    #[error("Version conflict: tried to replace version {expected}, store holds {found}")]
    Conflict { expected: u64, found: u64 },
}

/// Settings validation errors.
///
/// Rejected input never mutates persisted state.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Invalid numeric value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },

    /// Malformed blocked-site entry
    #[error("Invalid blocked-site entry: '{0}'")]
    InvalidSite(String),

    /// Entry already present in the blocked list
    #[error("Site '{0}' is already in the blocked list")]
    DuplicateSite(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
