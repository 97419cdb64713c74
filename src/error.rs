// src/error.rs
use thiserror::Error;

/// Failures that are not a business-rule rejection. The HTTP adapter turns
/// every one of these into a 500.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("Invalid end date: '{0}'")]
    InvalidEndDate(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Failed to serialize response: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl PollError {
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}
