//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based opaque connection identifier
//! - `Handle`: nickname shown to other users, 3-20 chars of `[A-Za-z0-9_-]`

use std::borrow::Borrow;

use uuid::Uuid;

use crate::error::CommandError;

/// Shortest accepted handle
pub const HANDLE_MIN_LEN: usize = 3;

/// Longest accepted handle
pub const HANDLE_MAX_LEN: usize = 20;

/// Opaque connection identifier (newtype pattern)
///
/// Wraps a UUID v4. Two sessions never share an id, even if they end up
/// using the same handle at different times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User handle (nickname)
///
/// Handles typed by users go through [`Handle::parse`]. Default handles are
/// built from connection data with [`Handle::derived`] and are not re-validated,
/// so a long prefix plus port plus suffix may exceed the user-facing limit.
/// Comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Validate a user-supplied handle
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        if Self::is_valid(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(CommandError::InvalidHandle)
        }
    }

    /// Check a candidate against `^[A-Za-z0-9_-]{3,20}$`
    pub fn is_valid(raw: &str) -> bool {
        (HANDLE_MIN_LEN..=HANDLE_MAX_LEN).contains(&raw.len())
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    }

    /// Default handle for a fresh connection, e.g. `User51234`
    pub fn derived(prefix: &str, port: u16) -> Self {
        Self(format!("{prefix}{port}"))
    }

    /// Collision probe candidate: `base_1`, `base_2`, ...
    pub fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}_{}", self.0, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Handle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
