//! # WebSocket Transport
//!
//! Carries protocol messages between the UI and the [`Router`] as JSON text
//! frames on `127.0.0.1:{port}`.
//!
//! ```text
//!  socket ──text──► router.handle() ──► Outbox ──► writer task ──text──► socket
//!                                         ▲
//!  workspace events ──► forwarder task ───┘
//! ```
//!
//! Inbound messages on one connection are handled in arrival order, so
//! replies come back in request order. Binary frames are ignored.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::{self, Message};
use uuid::Uuid;

use crate::core::protocol::{Outbound, Outbox};
use crate::core::router::Router;
use crate::workspace::Workspace;

const OUTBOX_CAPACITY: usize = 64;

/// Binds the UI socket on the loopback interface.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on ws://{}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts connections until the listener fails. Each connection gets its
/// own task.
pub async fn serve(
    listener: TcpListener,
    router: Arc<Router>,
    workspace: Arc<dyn Workspace>,
) -> std::io::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let router = router.clone();
        let workspace = workspace.clone();
        tokio::spawn(async move {
            let id = Uuid::new_v4();
            info!("Connection {} from {}", id, addr);
            match handle_connection(id, stream, router, workspace).await {
                Ok(()) => info!("Connection {} closed", id),
                Err(e) => error!("Connection {} failed: {}", id, e),
            }
        });
    }
}

async fn handle_connection(
    id: Uuid,
    stream: TcpStream,
    router: Arc<Router>,
    workspace: Arc<dyn Workspace>,
) -> Result<(), tungstenite::Error> {
    let socket = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = socket.split();
    let (outbox, mut outgoing) = Outbox::channel(OUTBOX_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            if let Err(e) = sink.send(Message::Text(message.to_json().into())).await {
                warn!("Connection {} write failed: {}", id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut events = workspace.subscribe();
    let forwarder = {
        let outbox = outbox.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => outbox.send(Outbound::from(&event)).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Connection {} missed {} workspace events", id, skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    let mut result = Ok(());
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => router.handle(text.as_str(), &outbox).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(bytes)) => {
                debug!("Connection {} ignored {} binary bytes", id, bytes.len())
            }
            Ok(_) => {}
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    forwarder.abort();
    // The writer drains whatever is queued once the last Outbox is gone.
    drop(outbox);
    let _ = writer.await;
    result
}
