//! Error types for coffee-core operations.
//!
//! Only `LaunchFailure` and the input-validation variants are meant to reach a
//! user. Termination and corrupt-state errors are produced internally, logged,
//! and then absorbed by the caller so that stopping can never get stuck.

use std::path::PathBuf;

/// All errors that can occur in coffee-core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoffeeError {
    // ─────────────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to launch sleep inhibitor {program}: {reason}")]
    LaunchFailure { program: String, reason: String },

    #[error("Could not confirm inhibitor {pid} was terminated: {reason}")]
    TerminationFailure { pid: u32, reason: String },

    #[error("Stored state for '{key}' is corrupt: {details}")]
    CorruptState { key: String, details: String },

    #[error("Sleep prevention is not supported on this platform: {0}")]
    UnsupportedEnvironment(String),

    #[error("No running application matches '{0}'")]
    AppNotFound(String),

    // ─────────────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid schedule for {day}: {reason}")]
    InvalidSchedule { day: String, reason: String },

    #[error("Invalid time of day '{0}' (expected HH:MM)")]
    InvalidTime(String),

    #[error("Invalid duration '{0}' (expected e.g. 45m, 1h30m, 2h)")]
    InvalidDuration(String),

    #[error("Unknown weekday '{0}'")]
    InvalidDay(String),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration / I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CoffeeError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CoffeeError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        CoffeeError::Json {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn launch(program: impl Into<String>, reason: impl Into<String>) -> Self {
        CoffeeError::LaunchFailure {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results using CoffeeError.
pub type Result<T> = std::result::Result<T, CoffeeError>;

impl From<CoffeeError> for String {
    fn from(err: CoffeeError) -> String {
        err.to_string()
    }
}
