//! Error types for the chat server
//!
//! Defines application-level errors, credential store errors and
//! message send errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// protocol errors (user is re-prompted).
#[derive(Debug, Error)]
pub enum AppError {
    /// Line framing error: invalid UTF-8 or line too long (fatal)
    #[error("Line codec error: {0}")]
    Codec(#[from] tokio_util::codec::LinesCodecError),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Nickname length outside the accepted range
    #[error("Invalid nickname length: {0}")]
    InvalidNickname(usize),

    /// Password could not be hashed
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Credential store failure (fatal to the session)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Store refused to create a user that did not exist at lookup time
    #[error("Registration rejected for '{0}'")]
    RegistrationRejected(String),
}

/// Credential store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the user database failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The user database is not valid JSON
    #[error("Corrupt user database: {0}")]
    Json(#[from] serde_json::Error),
}

/// Message send errors
///
/// Sends to a client never wait: a client whose outbound queue is full
/// gets `QueueFull` instead of stalling the sender.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client's outbound queue is full (it is not reading)
    #[error("Outbound queue full")]
    QueueFull,
}
