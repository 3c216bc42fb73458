//! Connection handler
//!
//! Frames one accepted byte stream into lines, forwards them to the
//! ChatRoom actor and writes the actor's replies back.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, info, warn};

use crate::config::ConnectionSettings;
use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Outbound queue depth per connection
const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Handle a new connection
///
/// Registers the connection with the ChatRoom, then runs a read task
/// (lines → `ServerCommand::Line`) and a write task (`ServerMessage` →
/// lines) until either side ends. The ChatRoom closes a connection by
/// dropping its session, which ends the write task. Read errors and
/// oversize lines are treated like end-of-stream. `Disconnect` is always
/// sent on the way out.
pub async fn handle_connection<S>(
    stream: S,
    remote_addr: String,
    cmd_tx: mpsc::Sender<ServerCommand>,
    settings: ConnectionSettings,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let framed = Framed::new(
        stream,
        LinesCodec::new_with_max_length(settings.max_line_length),
    );
    let (mut line_sender, mut line_receiver) = framed.split();

    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, remote_addr);

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER_SIZE);

    // Register with ChatRoom
    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            remote_addr,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    let timeout_task = settings
        .handshake_timeout
        .map(|timeout| spawn_handshake_timer(client_id, timeout, cmd_tx.clone()));

    // Clone cmd_tx for read task
    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (lines -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(line_result) = line_receiver.next().await {
            match line_result {
                Ok(line) => {
                    let cmd = ServerCommand::Line { client_id, line };
                    if cmd_tx_read.send(cmd).await.is_err() {
                        debug!("Server closed, ending read task for {}", client_id);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Read error for {}: {}", client_id, AppError::from(e));
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (ServerMessage -> lines)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if let Err(e) = line_sender.send(msg.to_string()).await {
                debug!("Write failed, ending write task: {}", AppError::from(e));
                break;
            }
        }
        debug!("Write task ended for client");

        // Shut down our side of the stream when done
        let _ = line_sender.close().await;
    });

    // Wait for either task to complete
    let write_done = tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            false
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            true
        }
    };

    // Either side ending closes the whole connection
    read_task.abort();
    if let Some(task) = timeout_task {
        task.abort();
    }

    // Send disconnect command
    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    // Let queued replies drain once the session is gone
    if !write_done {
        let _ = write_task.await;
    }

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Tell the ChatRoom when `timeout` has passed; aborted when the connection ends
fn spawn_handshake_timer(
    client_id: ClientId,
    timeout: Duration,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let _ = cmd_tx
            .send(ServerCommand::HandshakeTimeout { client_id })
            .await;
    })
}
