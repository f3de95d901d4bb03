//! Application-wide error types using thiserror.

use overlord_commands::ServiceError;
use overlord_common::OverlordError;
use overlord_config::ConfigError;

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Shared setup failure (logging, HTTP clients).
    #[error(transparent)]
    Common(#[from] OverlordError),

    /// A store or service failed during startup or shutdown.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// The chat server closed, refused or broke the session.
    #[error("Chat connection error: {0}")]
    Connection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the bot application.
pub type BotResult<T> = Result<T, BotError>;
