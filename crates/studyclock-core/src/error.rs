//! Core error types for studyclock-core.
//!
//! Every fallible operation in the library returns one of the enums below.
//! Engine transitions never panic: the worst outcome is a rejected transition
//! reported as [`EngineError::InvalidState`].

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerStatus;

/// Error raised by a [`TimerObserver`](crate::timer::TimerObserver) callback.
///
/// The engine catches these, logs them and keeps ticking.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for studyclock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session building errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Rejected engine transitions
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Preset and history storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors produced while turning a configuration into a plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The configuration cannot produce a runnable session.
    #[error("Invalid session config: '{field}' {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },

    /// A hand-authored plan breaks the phase invariants.
    #[error("Invalid session plan: {0}")]
    InvalidPlan(String),
}

impl SessionError {
    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        SessionError::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}

/// Errors produced by the timer state machine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The requested transition is not allowed from the current status.
    /// Engine state is left untouched.
    #[error("cannot {operation} while timer is {status}")]
    InvalidState {
        operation: &'static str,
        status: TimerStatus,
    },
}

/// Preset and history storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A stored row could not be decoded
    #[error("Corrupt record '{id}': {message}")]
    Corrupt { id: String, message: String },

    /// A stored config could not be encoded
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// No preset with the given id
    #[error("Preset not found: {0}")]
    NotFound(String),

    /// The data directory could not be created
    #[error("Data directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
