//! Core error types for pranayama-core.
//!
//! This module defines the error hierarchy using thiserror. Note that the
//! breathing engine itself has no failure modes: policy outcomes such as a
//! rejected alternate-nostril request are reported as notices, and sink
//! failures are swallowed at the sink boundary via [`SinkError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pranayama-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Preset management errors
    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Every phase of a pattern is zero, so a session could never advance
    #[error("Pattern must have at least one phase longer than zero seconds")]
    EmptyPattern,

    /// Unknown difficulty tier name
    #[error("Unknown tier '{0}' (expected easy, medium or hard)")]
    UnknownTier(String),

    /// Unknown ambient sound name
    #[error("Unknown ambient sound '{0}' (expected none, rain, wind or white)")]
    UnknownAmbient(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Preset storage errors.
#[derive(Error, Debug, PartialEq)]
pub enum PresetError {
    /// A preset with this name already exists and overwrite was not requested
    #[error("Preset \"{0}\" already exists")]
    AlreadyExists(String),

    /// No preset with this name
    #[error("Preset \"{0}\" not found")]
    NotFound(String),

    /// Preset names must not be blank
    #[error("Preset name must not be empty")]
    EmptyName,
}

/// Failure reported by a notification or audio sink.
///
/// Never propagated past the sink boundary; the engine logs and continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    /// The host does not provide this capability
    #[error("{0} is not supported on this host")]
    Unsupported(&'static str),

    /// The user or platform denied access
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The sink failed while delivering
    #[error("sink failed: {0}")]
    Failed(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
