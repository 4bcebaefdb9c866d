//! Per-client WebSocket loop.
//!
//! Reads subscribe commands from the client and writes the batches the hub
//! queues for it. A client is `CONNECTED` from registration until either
//! side closes; there are no intermediate states.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::ClientCommand;
use crate::domain::ClientId;
use crate::relay::RelayHandle;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Registers the client with the hub, then forwards every queued batch.
/// - Parses inbound subscribe frames; malformed frames are logged and
///   dropped without closing the socket.
/// - Deregisters the client on close or error.
pub async fn run_connection(socket: WebSocket, relay: RelayHandle) {
    let client_id = ClientId::new();
    let outbound = match relay.connect(client_id).await {
        Ok(rx) => rx,
        Err(e) => {
            tracing::warn!(%client_id, error = %e, "rejecting client");
            return;
        }
    };

    serve(socket, client_id, outbound, &relay).await;

    let _ = relay.disconnect(client_id).await;
    tracing::debug!(%client_id, "ws connection closed");
}

async fn serve(
    socket: WebSocket,
    client_id: ClientId,
    mut outbound: mpsc::Receiver<Arc<str>>,
    relay: &RelayHandle,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_text_message(client_id, text.as_str(), relay).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        let Ok(text) = std::str::from_utf8(&bytes) else {
                            tracing::debug!(
                                %client_id,
                                len = bytes.len(),
                                "ignoring non-UTF-8 binary frame"
                            );
                            continue;
                        };
                        if !handle_text_message(client_id, text, relay).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(%client_id, error = %e, "ws read error");
                        break;
                    }
                    _ => {}
                }
            }
            // Batch queued by the hub
            payload = outbound.recv() => {
                let Some(payload) = payload else {
                    break;
                };
                let text: &str = &payload;
                if ws_tx.send(Message::text(text)).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Handles a text frame from the client. Returns `false` once the hub is gone.
async fn handle_text_message(client_id: ClientId, text: &str, relay: &RelayHandle) -> bool {
    let command = match ClientCommand::parse(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(%client_id, error = %e, "ignoring malformed client frame");
            return true;
        }
    };

    let symbols = command.symbols();
    if symbols.is_empty() {
        tracing::debug!(%client_id, "subscribe without valid symbols");
        return true;
    }
    tracing::debug!(%client_id, count = symbols.len(), "client subscribe");
    relay.subscribe(client_id, symbols).await.is_ok()
}
