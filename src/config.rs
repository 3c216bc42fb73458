//! Server configuration
//!
//! Built from the command line in `main.rs`; the library only sees
//! these plain structs.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// The server always binds to the loopback interface
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default maximum length of a single protocol line, in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// Default time a connection may take to log in
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(300);

/// Argon2 cost parameters for newly registered passwords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingConfig {
    /// Memory in KiB
    pub memory_cost: u32,
    /// Number of iterations
    pub time_cost: u32,
    /// Number of lanes
    pub parallelism: u32,
}

impl Default for HashingConfig {
    /// OWASP-recommended Argon2id parameters (19 MiB, 2 iterations, 1 lane)
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Per-connection settings handed to every connection handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Close connections that have not joined after this long (`None` = never)
    pub handshake_timeout: Option<Duration>,
    /// Lines longer than this terminate the connection
    pub max_line_length: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    /// 0 binds an ephemeral port
    pub port: u16,
    /// JSON user database
    pub user_db: PathBuf,
    /// Append-only log file (`None` = console only)
    pub log_file: Option<PathBuf>,
    /// Overrides `RUST_LOG` when set
    pub log_level: Option<String>,
    pub connection: ConnectionSettings,
    pub hashing: HashingConfig,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
