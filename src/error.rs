//! Error handling module for bindsetup
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Orchestration code wraps these in `anyhow` with context at the call site.

use thiserror::Error;

/// Main error type for bindsetup
#[derive(Error, Debug)]
pub enum BindSetupError {
    /// IO errors (writing the configuration file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (the file cannot be read)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (domain names, timers, paths)
    #[error("Validation error: {0}")]
    Validation(String),

    /// External command failures (apt-get, named-checkconf, systemctl...)
    #[error("Command failed: {0}")]
    Command(String),

    /// System errors (privileges, missing binaries)
    #[error("System error: {0}")]
    System(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for bindsetup operations
pub type Result<T> = std::result::Result<T, BindSetupError>;

impl BindSetupError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a system error
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }
}
