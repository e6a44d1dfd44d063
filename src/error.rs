//! Error types for the chat relay
//!
//! Defines fatal application errors, user-facing command errors and
//! session delivery errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Application-level errors
///
/// These end a connection (or, for accept failures, the server). They are
/// logged, never sent to a user.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error (fatal for the connection)
    #[error("Line codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server stopped accepting sessions
    #[error("Server is shutting down")]
    ShuttingDown,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors reported back to the sender of a command
///
/// The `Display` text is the exact line the sender receives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Command given without its required arguments
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// Handle does not match the allowed pattern
    #[error("Invalid nick. Use 3-20 chars: letters, digits, '_' or '-'.")]
    InvalidHandle,

    /// Rename to the handle the session already has
    #[error("You already have that nick.")]
    SameHandle,

    /// Handle is registered to another session
    #[error("Nick already taken: {0}")]
    HandleTaken(String),

    /// Directed message to a handle nobody has
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Verb not in the command table
    #[error("Unknown command. Available: /nick /w /list /quit")]
    UnknownCommand(String),
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad handle pattern or malformed command
    Validation,
    /// Handle already taken
    Conflict,
    /// Target handle absent
    NotFound,
}

impl CommandError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Usage(_)
            | Self::InvalidHandle
            | Self::SameHandle
            | Self::UnknownCommand(_) => ErrorCode::Validation,
            Self::HandleTaken(_) => ErrorCode::Conflict,
            Self::UserNotFound(_) => ErrorCode::NotFound,
        }
    }
}

/// Message send errors
///
/// Occurs when a session's outbound queue cannot take another line.
#[derive(Debug, Error)]
pub enum SendError {
    /// The writer side of the session has gone away
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not reading fast enough
    #[error("Outbound queue full")]
    Backlogged,
}
