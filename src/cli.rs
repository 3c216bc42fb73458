//! Command line interface

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{ConnectionSettings, HashingConfig, ServerConfig, DEFAULT_HOST};

#[derive(Parser, Debug)]
#[command(name = "chat_server", version, about = "Line-oriented multi-user chat server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the server
    #[command(name = "server:start")]
    ServerStart(ServerStartArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerStartArgs {
    /// On which port should the server listen? (0 picks a free port)
    pub port: u16,

    /// JSON file holding registered nicknames and password hashes
    #[arg(long, default_value = "users.json", env = "CHAT_USER_DB")]
    pub user_db: PathBuf,

    /// Append-only log file
    #[arg(long, default_value = "chat.log")]
    pub log_file: PathBuf,

    /// Seconds a connection may take to log in (0 disables the timeout)
    #[arg(long, default_value_t = 300)]
    pub handshake_timeout: u64,

    /// Maximum accepted line length in bytes
    #[arg(long, default_value_t = crate::config::DEFAULT_MAX_LINE_LENGTH)]
    pub max_line_length: usize,

    /// Log filter override (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl From<ServerStartArgs> for ServerConfig {
    fn from(args: ServerStartArgs) -> Self {
        let handshake_timeout = match args.handshake_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            host: DEFAULT_HOST,
            port: args.port,
            user_db: args.user_db,
            log_file: Some(args.log_file),
            log_level: args.log_level,
            connection: ConnectionSettings {
                handshake_timeout,
                max_line_length: args.max_line_length,
            },
            hashing: HashingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_start_parses_port() {
        let cli = Cli::try_parse_from(["chat_server", "server:start", "4000"]).unwrap();
        let Command::ServerStart(args) = cli.command;
        assert_eq!(args.port, 4000);
        assert_eq!(args.handshake_timeout, 300);

        let config = ServerConfig::from(args);
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:4000");
        assert_eq!(config.log_file, Some(PathBuf::from("chat.log")));
    }

    #[test]
    fn test_zero_timeout_disables_handshake_timeout() {
        let cli = Cli::try_parse_from([
            "chat_server",
            "server:start",
            "4000",
            "--handshake-timeout",
            "0",
        ])
        .unwrap();
        let Command::ServerStart(args) = cli.command;
        let config = ServerConfig::from(args);
        assert_eq!(config.connection.handshake_timeout, None);
    }

    #[test]
    fn test_port_is_required() {
        assert!(Cli::try_parse_from(["chat_server", "server:start"]).is_err());
    }
}
