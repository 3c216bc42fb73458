//! End-to-end conversations over in-memory streams, through the real
//! connection handler, ChatRoom actor and JSON user database.

use std::path::Path;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

use chat_server::{
    handle_connection, Argon2Scheme, ChatRoom, ConnectionSettings, HashingConfig, JsonUserStore,
    ServerCommand,
};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

const LOGIN_PROMPT: &str = "Please login by entering your unique nickname:";
const REGISTER_PROMPT: &str = "This is a new nickname, please enter a password to register:";

struct TestServer {
    cmd_tx: mpsc::Sender<ServerCommand>,
    settings: ConnectionSettings,
}

impl TestServer {
    fn start(db_path: &Path, settings: ConnectionSettings) -> Self {
        let store = JsonUserStore::open(db_path).expect("open user database");
        let scheme = Argon2Scheme::new(&HashingConfig {
            memory_cost: 8,
            time_cost: 1,
            parallelism: 1,
        })
        .expect("argon2 params");

        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        tokio::spawn(ChatRoom::new(cmd_rx, Box::new(store), Box::new(scheme)).run());
        Self { cmd_tx, settings }
    }

    fn connect(&self) -> Client {
        let (server_side, client_side) = tokio::io::duplex(4096);
        tokio::spawn(handle_connection(
            server_side,
            "127.0.0.1:50000".to_string(),
            self.cmd_tx.clone(),
            self.settings,
        ));
        Client {
            framed: Framed::new(client_side, LinesCodec::new()),
        }
    }
}

struct Client {
    framed: Framed<DuplexStream, LinesCodec>,
}

impl Client {
    async fn send(&mut self, line: &str) {
        self.framed.send(line).await.expect("send line");
    }

    async fn recv(&mut self) -> Option<String> {
        timeout(READ_TIMEOUT, self.framed.next())
            .await
            .expect("timed out waiting for a line")
            .map(|line| line.expect("valid line"))
    }

    async fn expect(&mut self, expected: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(expected));
    }

    /// Nothing arrives within a short grace period
    async fn expect_silence(&mut self) {
        let result = timeout(Duration::from_millis(200), self.framed.next()).await;
        assert!(result.is_err(), "unexpected line: {:?}", result);
    }

    /// Register a new nickname and wait for the welcome line
    async fn register(&mut self, nickname: &str, password: &str, members: usize) {
        self.expect(LOGIN_PROMPT).await;
        self.send(nickname).await;
        self.expect(REGISTER_PROMPT).await;
        self.send(password).await;
        self.expect(&format!(
            "Welcome to our chat {}. The current amount of connections is {}",
            nickname.to_lowercase(),
            members
        ))
        .await;
    }
}

fn no_timeout() -> ConnectionSettings {
    ConnectionSettings {
        handshake_timeout: None,
        ..ConnectionSettings::default()
    }
}

#[tokio::test]
async fn register_then_login_again() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("users.json");
    let server = TestServer::start(&db, no_timeout());

    let mut alice = server.connect();
    alice.register("alice", "secret123", 1).await;
    alice.send("/quit").await;
    alice.expect("Bye!").await;
    assert_eq!(alice.recv().await, None);

    // Wrong password is re-prompted, right one joins
    let mut again = server.connect();
    again.expect(LOGIN_PROMPT).await;
    again.send("Alice").await;
    again.expect("Password:").await;
    again.send("wrong").await;
    again.expect("Invalid nickname password, try again:").await;
    again.send("secret123").await;
    again
        .expect("Welcome to our chat alice. The current amount of connections is 1")
        .await;
}

#[tokio::test]
async fn accounts_persist_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("users.json");

    {
        let server = TestServer::start(&db, no_timeout());
        let mut alice = server.connect();
        alice.register("alice", "secret123", 1).await;
    }

    let server = TestServer::start(&db, no_timeout());
    let mut alice = server.connect();
    alice.expect(LOGIN_PROMPT).await;
    alice.send("alice").await;
    alice.expect("Password:").await;
    alice.send("secret123").await;
    alice
        .expect("Welcome to our chat alice. The current amount of connections is 1")
        .await;

    let saved = std::fs::read_to_string(&db).unwrap();
    assert!(saved.contains("\"alice\""));
    assert!(!saved.contains("secret123"));
}

#[tokio::test]
async fn broadcast_reaches_everyone_but_sender() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(&dir.path().join("users.json"), no_timeout());

    let mut alice = server.connect();
    alice.register("alice", "pw-a", 1).await;
    let mut bob = server.connect();
    bob.register("bob", "pw-b", 2).await;
    let mut carol = server.connect();
    carol.register("carol", "pw-c", 3).await;

    alice.send("hello\r").await;
    bob.expect("alice> hello").await;
    carol.expect("alice> hello").await;
    alice.expect_silence().await;

    // A client quits and stops receiving
    carol.send("/quit").await;
    carol.expect("Bye!").await;
    assert_eq!(carol.recv().await, None);

    bob.send("just us now").await;
    alice.expect("bob> just us now").await;
}

#[tokio::test]
async fn invalid_nickname_is_reprompted() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(&dir.path().join("users.json"), no_timeout());

    let mut client = server.connect();
    client.expect(LOGIN_PROMPT).await;
    client.send("al").await;
    client.expect(LOGIN_PROMPT).await;
    client.send("a-very-long-nickname").await;
    client.expect(LOGIN_PROMPT).await;
    client.send("alice").await;
    client.expect(REGISTER_PROMPT).await;
}

#[tokio::test]
async fn nickname_only_client_is_never_a_member() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(&dir.path().join("users.json"), no_timeout());

    let mut alice = server.connect();
    alice.register("alice", "pw-a", 1).await;

    let mut lurker = server.connect();
    lurker.expect(LOGIN_PROMPT).await;
    lurker.send("lurker").await;
    lurker.expect(REGISTER_PROMPT).await;

    alice.send("anyone?").await;
    lurker.expect_silence().await;

    // The lurker did not count towards membership
    let mut bob = server.connect();
    bob.register("bob", "pw-b", 2).await;
}

#[tokio::test]
async fn idle_login_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(
        &dir.path().join("users.json"),
        ConnectionSettings {
            handshake_timeout: Some(Duration::from_millis(100)),
            ..ConnectionSettings::default()
        },
    );

    let mut idle = server.connect();
    idle.expect(LOGIN_PROMPT).await;
    idle.expect("Login timed out, closing connection.").await;
    assert_eq!(idle.recv().await, None);
}

#[tokio::test]
async fn joined_clients_outlive_the_login_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(
        &dir.path().join("users.json"),
        ConnectionSettings {
            handshake_timeout: Some(Duration::from_millis(300)),
            ..ConnectionSettings::default()
        },
    );

    let mut alice = server.connect();
    alice.register("alice", "pw-a", 1).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    alice.send("/nick alicia").await;
    alice
        .expect("You want to change your nickname, good idea")
        .await;
}

#[tokio::test]
async fn oversize_line_closes_connection() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(
        &dir.path().join("users.json"),
        ConnectionSettings {
            handshake_timeout: None,
            max_line_length: 16,
        },
    );

    let mut client = server.connect();
    client.expect(LOGIN_PROMPT).await;
    client.send(&"x".repeat(64)).await;
    assert_eq!(client.recv().await, None);
}
