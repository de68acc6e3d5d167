//! Error handling for stakehost
//!
//! Centralized error types using thiserror. All fallible operations in the
//! crate return these types so failures surface uniformly at the CLI.

use thiserror::Error;

/// Main error type for stakehost
#[derive(Error, Debug)]
pub enum StakehostError {
    /// IO errors (file operations, pipes, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input validation errors (addresses, paths, menu choices)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Host provisioning errors (users, groups, directories, ownership)
    #[error("Provisioning error: {0}")]
    Provision(String),

    /// External command failures (docker, ufw, crontab, deposit CLI)
    #[error("Command failed: {0}")]
    Command(String),

    /// Validator key generation/import errors
    #[error("Key generation error: {0}")]
    KeyGen(String),

    /// Setup stage machine transition errors
    #[error("Stage transition error: {0}")]
    Transition(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for stakehost operations
pub type Result<T> = std::result::Result<T, StakehostError>;

// Convenient error constructors
impl StakehostError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a provisioning error
    pub fn provision(msg: impl Into<String>) -> Self {
        Self::Provision(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a key generation error
    pub fn keygen(msg: impl Into<String>) -> Self {
        Self::KeyGen(msg.into())
    }

    /// Create a stage transition error
    pub fn transition(msg: impl Into<String>) -> Self {
        Self::Transition(msg.into())
    }
}
