//! Error types for the drive client, session and CLI.
//!
//! The navigation cache itself never returns these: it renders them and hands
//! the message to its listener.

use thiserror::Error;

/// Errors raised talking to the remote store or driving a session
#[derive(Debug, Error)]
pub enum DriveError {
    /// Network unreachable, timeout or an unreadable response body
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success status returned by the remote store
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No usable access token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A folder listing reported through the navigation listener failed
    #[error("Failed to load folder: {0}")]
    Listing(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriveError {
    /// Status code carried by an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            DriveError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return DriveError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        DriveError::Transport(err.to_string())
    }
}

impl From<config::ConfigError> for DriveError {
    fn from(err: config::ConfigError) -> Self {
        DriveError::ConfigError(err.to_string())
    }
}
