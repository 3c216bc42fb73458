//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique connection identifier
//! - `Nickname`: validated, lowercase-normalized nickname

use uuid::Uuid;

use crate::error::AppError;

/// Shortest accepted nickname, in characters
pub const NICKNAME_MIN_LEN: usize = 3;

/// Longest accepted nickname, in characters
pub const NICKNAME_MAX_LEN: usize = 15;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4. Sessions are keyed by this id rather than by
/// nickname, so a connection can be addressed before it has logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered identity's nickname
///
/// Always trimmed, lowercase, and between [`NICKNAME_MIN_LEN`] and
/// [`NICKNAME_MAX_LEN`] characters long. Two inputs differing only by
/// case parse to the same nickname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nickname(String);

impl Nickname {
    /// Validate and normalize raw user input
    ///
    /// The length is checked on the lowercased form, since lowercasing
    /// can change the number of characters.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let normalized = raw.trim().to_lowercase();
        let len = normalized.chars().count();
        if !(NICKNAME_MIN_LEN..=NICKNAME_MAX_LEN).contains(&len) {
            return Err(AppError::InvalidNickname(len));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Nickname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
