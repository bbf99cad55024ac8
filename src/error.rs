//! Error types for Vitalis.

use chrono::{NaiveDate, NaiveTime};

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Rejections produced by the metrics validator.
///
/// All are recovered locally: the session re-emits the same prompt with a
/// corrective message and does not advance.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{input}' is not a number")]
    NotANumber { input: String },

    #[error("{value} is outside the allowed range {min}..{max}")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("'{token}' is not one of the offered options")]
    UnknownOption { token: String },
}

/// Gate and routing errors for the conversation flow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("Daily entry opens at {cutoff} local time; it is currently {now}")]
    TooEarly { cutoff: NaiveTime, now: NaiveTime },

    #[error("A record for {date} has already been submitted")]
    AlreadySubmitted { date: NaiveDate },

    #[error("User {user_id} is not registered")]
    NotRegistered { user_id: String },

    #[error("No active session for user {user_id}")]
    NoActiveSession { user_id: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to deliver message to user {user_id}: {reason}")]
    SendFailed { user_id: String, reason: String },

    #[error("Channel closed")]
    Closed,
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
