//! ChatRoom actor implementation
//!
//! The central actor that owns every session, the members registry and
//! the credential store. Uses the Actor pattern with mpsc channels: each
//! command runs to completion (store calls included) before the next one
//! starts, and per-connection order is preserved by the channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::auth::PasswordScheme;
use crate::error::SendError;
use crate::members::Members;
use crate::message::{ChatCommand, ServerMessage};
use crate::session::{AuthProgress, ClientSession};
use crate::store::CredentialStore;
use crate::types::ClientId;

/// Commands sent from connection handlers to the ChatRoom actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New connection accepted
    Connect {
        client_id: ClientId,
        remote_addr: String,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// One line received from a connection
    Line { client_id: ClientId, line: String },
    /// Login deadline for a connection has passed
    HandshakeTimeout { client_id: ClientId },
    /// Connection closed or failed
    Disconnect { client_id: ClientId },
}

/// The chat room actor
pub struct ChatRoom {
    /// Every open connection, joined or not: ClientId -> ClientSession
    sessions: HashMap<ClientId, ClientSession>,
    /// Joined sessions, in join order
    members: Members,
    store: Box<dyn CredentialStore>,
    /// Shared with the blocking pool while a password is hashed
    scheme: Arc<dyn PasswordScheme>,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatRoom {
    pub fn new(
        receiver: mpsc::Receiver<ServerCommand>,
        store: Box<dyn CredentialStore>,
        scheme: Box<dyn PasswordScheme>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            members: Members::new(),
            store,
            scheme: Arc::from(scheme),
            receiver,
        }
    }

    /// Run the ChatRoom event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatRoom started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatRoom shutting down");
    }

    /// Process a single command
    pub async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect {
                client_id,
                remote_addr,
                sender,
            } => {
                self.handle_accept(client_id, remote_addr, sender);
            }
            ServerCommand::Line { client_id, line } => {
                self.handle_line(client_id, line).await;
            }
            ServerCommand::HandshakeTimeout { client_id } => {
                self.handle_handshake_timeout(client_id);
            }
            ServerCommand::Disconnect { client_id } => {
                self.leave(client_id);
            }
        }
    }

    /// Number of joined clients
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Number of open connections, joined or not
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_member(&self, client_id: ClientId) -> bool {
        self.members.contains(client_id)
    }

    /// Handle a new connection: create its session and prompt for a nickname
    fn handle_accept(
        &mut self,
        client_id: ClientId,
        remote_addr: String,
        sender: mpsc::Sender<ServerMessage>,
    ) {
        info!(%client_id, %remote_addr, "New connection");
        let session = ClientSession::new(client_id, remote_addr, sender);
        session.start();
        self.sessions.insert(client_id, session);
        debug!(
            "Total connections: {}, Total members: {}",
            self.sessions.len(),
            self.members.len()
        );
    }

    /// Route a line: members go through dispatch, everyone else through login
    async fn handle_line(&mut self, client_id: ClientId, line: String) {
        if self.members.contains(client_id) {
            self.dispatch(client_id, &line);
            return;
        }

        let Some(session) = self.sessions.get_mut(&client_id) else {
            debug!(%client_id, "Line for unknown client dropped");
            return;
        };

        match session
            .on_line(line, self.store.as_mut(), &self.scheme)
            .await
        {
            Ok(AuthProgress::Authenticated) => self.join(client_id),
            Ok(AuthProgress::Pending) => {}
            Err(e) => {
                error!(%client_id, error = %e, "Login failed, closing connection");
                self.close_with(client_id, ServerMessage::InternalError);
            }
        }
    }

    /// Close connections that have not joined by their deadline
    fn handle_handshake_timeout(&mut self, client_id: ClientId) {
        let Some(session) = self.sessions.get(&client_id) else {
            return;
        };
        if session.is_joined() {
            return;
        }

        info!(
            %client_id,
            remote_addr = %session.remote_address(),
            "Login timed out, closing connection"
        );
        self.close_with(client_id, ServerMessage::LoginTimedOut);
    }

    /// Make an authenticated session a member and welcome it
    ///
    /// Only the joining client is told; other members are not notified.
    pub fn join(&mut self, client_id: ClientId) {
        let Some(session) = self.sessions.get_mut(&client_id) else {
            return;
        };
        if !session.is_authenticated() {
            warn!(%client_id, "Refusing to join unauthenticated client");
            return;
        }

        session.mark_joined();
        self.members.insert(client_id);

        let nickname = session.display_name().to_string();
        let members = self.members.len();
        info!(
            %client_id,
            %nickname,
            remote_addr = %session.remote_address(),
            members,
            "Client joined, welcome message sent"
        );

        let _ = session.send(ServerMessage::Welcome { nickname, members });
    }

    /// Forget a connection
    ///
    /// Dropping the session closes its outbound channel, which closes the
    /// connection. Remaining members are not notified. Returns false if
    /// the client was already gone.
    pub fn leave(&mut self, client_id: ClientId) -> bool {
        let was_member = self.members.remove(client_id);
        let Some(session) = self.sessions.remove(&client_id) else {
            return false;
        };

        if was_member {
            info!(
                %client_id,
                nickname = %session.display_name(),
                remote_addr = %session.remote_address(),
                "Client left"
            );
        } else {
            info!(
                %client_id,
                remote_addr = %session.remote_address(),
                "Connection closed before login"
            );
        }
        debug!(
            "Total connections: {}, Total members: {}",
            self.sessions.len(),
            self.members.len()
        );
        true
    }

    /// Handle a line from a member: run a command or broadcast it
    pub fn dispatch(&mut self, client_id: ClientId, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match ChatCommand::parse(line) {
            Some(command) => self.run_command(client_id, command),
            None => self.broadcast(client_id, line),
        }
    }

    fn run_command(&mut self, client_id: ClientId, command: ChatCommand) {
        let Some(session) = self.sessions.get(&client_id) else {
            return;
        };
        info!(
            %client_id,
            remote_addr = %session.remote_address(),
            "Processing command {}",
            command.name()
        );

        match command {
            ChatCommand::Quit => {
                self.close_with(client_id, ServerMessage::Bye);
            }
            ChatCommand::Nick => {
                let _ = session.send(ServerMessage::NickChangeRequested);
            }
        }
    }

    /// Send `text` from `client_id` to every other member, in join order
    ///
    /// Never waits on a recipient. A member whose outbound queue is full
    /// is disconnected instead of holding up the room.
    pub fn broadcast(&mut self, client_id: ClientId, text: &str) {
        let Some(sender) = self.sessions.get(&client_id) else {
            return;
        };
        let from = sender.display_name().to_string();

        let mut slow = Vec::new();
        for member_id in self.members.others(client_id) {
            let Some(member) = self.sessions.get(&member_id) else {
                continue;
            };
            let msg = ServerMessage::Chat {
                from: from.clone(),
                content: text.to_string(),
            };
            if let Err(SendError::QueueFull) = member.send(msg) {
                slow.push(member_id);
            }
        }

        for member_id in slow {
            warn!(client_id = %member_id, "Outbound queue full, disconnecting slow client");
            self.leave(member_id);
        }
    }

    /// Send a final message, then close the connection and forget it
    fn close_with(&mut self, client_id: ClientId, msg: ServerMessage) {
        if let Some(session) = self.sessions.get(&client_id) {
            let _ = session.send(msg);
        }
        self.leave(client_id);
    }
}
