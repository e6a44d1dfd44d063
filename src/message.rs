//! Outbound line protocol
//!
//! Every line the server writes to a client is a `ServerMessage`. Its
//! `Display` impl is the wire format; clients match on these prefixes.

use std::fmt;

use crate::error::CommandError;

/// Sender name used for system lines
pub const SYSTEM_SENDER: &str = "SERVER";

/// Server → Client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Public chat: `[from]: text`
    Chat { from: String, text: String },
    /// Private message to the recipient: `[PM from from]: text`
    PrivateFrom { from: String, text: String },
    /// Private message echo to the sender: `[PM to to]: text`
    PrivateTo { to: String, text: String },
    /// Announcement to everyone: `[SERVER]: text`
    System(String),
    /// Un-prefixed response to one user (welcome, errors, listings)
    Notice(String),
}

impl ServerMessage {
    pub fn notice(text: impl Into<String>) -> Self {
        Self::Notice(text.into())
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat { from, text } => write!(f, "[{from}]: {text}"),
            Self::PrivateFrom { from, text } => write!(f, "[PM from {from}]: {text}"),
            Self::PrivateTo { to, text } => write!(f, "[PM to {to}]: {text}"),
            Self::System(text) => write!(f, "[{SYSTEM_SENDER}]: {text}"),
            Self::Notice(text) => f.write_str(text),
        }
    }
}

/// Convert CommandError to a notice for the offending sender
impl From<CommandError> for ServerMessage {
    fn from(err: CommandError) -> Self {
        Self::Notice(err.to_string())
    }
}
