//! ClientSession: one connection's login state machine
//!
//! A session walks a connection from "no nickname yet" to "joined".
//! It owns the outbound side of its connection; dropping the session
//! closes the connection.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::auth::PasswordScheme;
use crate::error::{AppError, SendError};
use crate::message::ServerMessage;
use crate::store::CredentialStore;
use crate::types::{ClientId, Nickname};

/// Where a session is in the login handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a valid nickname
    AwaitingNickname,
    /// Nickname accepted; waiting for its password.
    ///
    /// `stored_hash` is `None` when the nickname was not registered at
    /// lookup time, in which case the password registers it.
    AwaitingPassword {
        nickname: Nickname,
        stored_hash: Option<String>,
    },
    /// Credentials accepted, not yet a room member
    Authenticated,
    /// Member of the room; lines are routed by the room
    Joined,
}

/// Result of feeding one line to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProgress {
    /// More input needed (or the line was ignored)
    Pending,
    /// The line completed login; the room should join the session
    Authenticated,
}

/// Connected client and its protocol state
#[derive(Debug)]
pub struct ClientSession {
    id: ClientId,
    remote_addr: String,
    state: SessionState,
    nickname: Option<Nickname>,
    /// Server → Client message channel
    sender: mpsc::Sender<ServerMessage>,
}

impl ClientSession {
    pub fn new(id: ClientId, remote_addr: String, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            remote_addr,
            state: SessionState::AwaitingNickname,
            nickname: None,
            sender,
        }
    }

    /// Send the login prompt
    pub fn start(&self) {
        let _ = self.send(ServerMessage::LoginPrompt);
    }

    /// Queue a message for this client without waiting
    ///
    /// Fails with `QueueFull` when the client is not reading fast enough,
    /// and with `ChannelClosed` once the connection is gone.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Feed one line of login input
    ///
    /// The line is trimmed before use, whether it is a nickname or a
    /// password. Validation and credential failures are answered with a
    /// re-prompt and never returned as errors. An `Err` means the store
    /// failed and the session cannot continue. Lines arriving after the
    /// session has authenticated are ignored.
    pub async fn on_line(
        &mut self,
        line: String,
        store: &mut dyn CredentialStore,
        scheme: &Arc<dyn PasswordScheme>,
    ) -> Result<AuthProgress, AppError> {
        match std::mem::replace(&mut self.state, SessionState::AwaitingNickname) {
            SessionState::AwaitingNickname => {
                self.submit_nickname(line.trim(), &*store)?;
                Ok(AuthProgress::Pending)
            }
            SessionState::AwaitingPassword {
                nickname,
                stored_hash,
            } => {
                // The plaintext password only lives until hashing or verification returns
                let password = line.trim().to_string();
                drop(line);
                self.submit_password(nickname, stored_hash, password, store, scheme)
                    .await
            }
            state @ (SessionState::Authenticated | SessionState::Joined) => {
                debug!(client_id = %self.id, "Ignoring login input after authentication");
                self.state = state;
                Ok(AuthProgress::Pending)
            }
        }
    }

    fn submit_nickname(&mut self, line: &str, store: &dyn CredentialStore) -> Result<(), AppError> {
        let nickname = match Nickname::parse(line) {
            Ok(nickname) => nickname,
            Err(e) => {
                debug!(client_id = %self.id, error = %e, "Rejected nickname");
                let _ = self.send(ServerMessage::LoginPrompt);
                return Ok(());
            }
        };

        let stored_hash = store.find_user(&nickname)?;
        let prompt = if stored_hash.is_some() {
            ServerMessage::PasswordPrompt
        } else {
            ServerMessage::RegisterPrompt
        };
        debug!(
            client_id = %self.id,
            nickname = %nickname,
            registered = stored_hash.is_some(),
            "Nickname submitted"
        );

        self.nickname = Some(nickname.clone());
        self.state = SessionState::AwaitingPassword {
            nickname,
            stored_hash,
        };
        let _ = self.send(prompt);
        Ok(())
    }

    async fn submit_password(
        &mut self,
        nickname: Nickname,
        stored_hash: Option<String>,
        password: String,
        store: &mut dyn CredentialStore,
        scheme: &Arc<dyn PasswordScheme>,
    ) -> Result<AuthProgress, AppError> {
        match stored_hash {
            None => {
                let hash = hash_password(scheme, password).await?;
                if !store.create_user(&nickname, hash)? {
                    return Err(AppError::RegistrationRejected(nickname.to_string()));
                }
                info!(client_id = %self.id, nickname = %nickname, "Registered new user");
            }
            Some(hash) => {
                if !verify_password(scheme, password, hash.clone()).await {
                    warn!(
                        client_id = %self.id,
                        nickname = %nickname,
                        remote_addr = %self.remote_addr,
                        "Invalid password"
                    );
                    self.state = SessionState::AwaitingPassword {
                        nickname,
                        stored_hash: Some(hash),
                    };
                    let _ = self.send(ServerMessage::InvalidPassword);
                    return Ok(AuthProgress::Pending);
                }
            }
        }

        self.state = SessionState::Authenticated;
        Ok(AuthProgress::Authenticated)
    }

    /// Record that the room has made this session a member
    pub fn mark_joined(&mut self) {
        if self.state == SessionState::Authenticated {
            self.state = SessionState::Joined;
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Credentials have been accepted (joined or about to join)
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.state,
            SessionState::Authenticated | SessionState::Joined
        )
    }

    pub fn is_joined(&self) -> bool {
        self.state == SessionState::Joined
    }

    pub fn nickname(&self) -> Option<&Nickname> {
        self.nickname.as_ref()
    }

    /// Get the display name for this client
    ///
    /// Returns the nickname if set, otherwise "unknown".
    pub fn display_name(&self) -> &str {
        self.nickname.as_ref().map_or("unknown", Nickname::as_str)
    }

    pub fn remote_address(&self) -> &str {
        &self.remote_addr
    }
}

/// Hash on the blocking pool so Argon2 does not stall a runtime worker
async fn hash_password(
    scheme: &Arc<dyn PasswordScheme>,
    password: String,
) -> Result<String, AppError> {
    let scheme = Arc::clone(scheme);
    tokio::task::spawn_blocking(move || scheme.hash(&password))
        .await
        .map_err(|e| AppError::PasswordHash(e.to_string()))?
}

async fn verify_password(scheme: &Arc<dyn PasswordScheme>, password: String, hash: String) -> bool {
    let scheme = Arc::clone(scheme);
    match tokio::task::spawn_blocking(move || scheme.verify(&password, &hash)).await {
        Ok(valid) => valid,
        Err(e) => {
            error!(error = %e, "Password verification task failed");
            false
        }
    }
}
