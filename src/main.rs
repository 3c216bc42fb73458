//! Line Chat Server - Entry Point
//!
//! Opens the user database, starts the ChatRoom actor and accepts
//! connections.

use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

use chat_server::cli::{Cli, Command};
use chat_server::{
    handle_connection, logging, Argon2Scheme, ChatRoom, JsonUserStore, ServerConfig,
};

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.command {
        Command::ServerStart(args) => ServerConfig::from(args),
    };

    logging::init(config.log_level.as_deref(), config.log_file.as_deref());

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Nothing is accepted until the user database is usable
    let store = match JsonUserStore::open(&config.user_db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Could not connect to the database");
            return Err(e.into());
        }
    };
    let scheme = Argon2Scheme::new(&config.hashing)?;

    // Start TCP listener
    let listener = TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;
    println!("Socket server listening on port {}.", local_addr.port());
    println!(
        "You can connect to it by running: telnet {} {}",
        local_addr.ip(),
        local_addr.port()
    );
    info!("Chat server listening on {}", local_addr);

    // Create ChatRoom actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let room = ChatRoom::new(cmd_rx, Box::new(store), Box::new(scheme));
    tokio::spawn(room.run());

    info!("ChatRoom actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let cmd_tx = cmd_tx.clone();
                let settings = config.connection;

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    let result =
                        handle_connection(stream, addr.to_string(), cmd_tx, settings).await;
                    if let Err(e) = result {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
