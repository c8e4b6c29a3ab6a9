//! Core error types for overseer-core.
//!
//! This module defines the error hierarchy using thiserror. Every domain
//! operation returns one of these kinds; all of them are recoverable at the
//! adapter boundary -- the core never terminates the process.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for overseer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Referenced entity absent or inactive.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// State machine re-entry on a terminal or non-pending state.
    #[error("{entity} {id} was already reviewed (status: {status})")]
    AlreadyReviewed {
        entity: &'static str,
        id: i64,
        status: String,
    },

    /// Actor does not own the entity being mutated, or lacks the role the
    /// operation requires.
    #[error("user {actor} is not authorized to {action}")]
    Unauthorized { actor: i64, action: String },

    /// The supervisor/assignee pair is already linked.
    #[error("relationship between supervisor {supervisor} and assignee {assignee} already exists")]
    DuplicateRelationship { supervisor: i64, assignee: i64 },

    /// The identity is already registered.
    #[error("user {0} is already registered")]
    DuplicateRegistration(i64),

    /// Malformed weekday set or time-of-day input.
    #[error("invalid recurrence rule: {0}")]
    InvalidRecurrenceRule(String),

    /// Not a recognized IANA timezone identifier.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Balance too low for a reward assignment.
    #[error("insufficient points: need {required}, have {available}")]
    InsufficientPoints { required: i64, available: i64 },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

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

    /// A uniqueness or foreign-key constraint was violated
    #[error("Constraint violated: {0}")]
    ConstraintViolated(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked => DatabaseError::Locked,
                rusqlite::ErrorCode::ConstraintViolation => DatabaseError::ConstraintViolated(
                    msg.clone().unwrap_or_else(|| e.to_string()),
                ),
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

impl CoreError {
    /// Whether the underlying cause is a uniqueness/FK constraint violation.
    pub(crate) fn is_constraint(&self) -> bool {
        matches!(
            self,
            CoreError::Database(DatabaseError::ConstraintViolated(_))
        )
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
