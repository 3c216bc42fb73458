//! Multi-user Line Chat Server Library
//!
//! A text-protocol chat server built on tokio: clients connect over TCP
//! (telnet works), log in with a nickname and password, and every line
//! they type is broadcast to the other logged-in clients.
//!
//! # Features
//! - Nickname/password login, registering unknown nicknames on first use
//! - Argon2id password hashes in a JSON user database
//! - Broadcast chat with `/quit` and `/nick` commands
//! - Login timeout for idle connections
//! - Console and append-only file logging
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatRoom` is the central actor owning all sessions and the member list
//! - Each connection has a `handler` task that frames lines and forwards them
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_server::{handle_connection, Argon2Scheme, ChatRoom, ConnectionSettings, JsonUserStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let store = JsonUserStore::open("users.json").unwrap();
//!     let scheme = Argon2Scheme::new(&Default::default()).unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatRoom::new(cmd_rx, Box::new(store), Box::new(scheme)).run());
//!
//!     while let Ok((stream, addr)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr.to_string(),
//!             cmd_tx,
//!             ConnectionSettings::default(),
//!         ));
//!     }
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod members;
pub mod message;
pub mod server;
pub mod session;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use auth::{Argon2Scheme, PasswordScheme};
pub use config::{ConnectionSettings, HashingConfig, ServerConfig};
pub use error::{AppError, SendError, StoreError};
pub use handler::handle_connection;
pub use members::Members;
pub use message::{ChatCommand, ServerMessage};
pub use server::{ChatRoom, ServerCommand};
pub use session::{AuthProgress, ClientSession, SessionState};
pub use store::{CredentialStore, JsonUserStore};
pub use types::{ClientId, Nickname};
