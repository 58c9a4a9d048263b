//! WebSocket stream loop.
//!
//! Forwards every envelope of one [`Subscription`] to the client, in
//! order, until the subscription ends or the client goes away. The stream
//! is server-to-client only; client text frames get an error reply.

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures_util::{SinkExt, StreamExt};

use super::messages::WsMessage;
use crate::domain::Subscription;

/// Runs the write loop for a single stream subscriber.
///
/// A `QUIT` envelope ends the subscription; the client then gets a normal
/// close frame with reason `"quit"`. Dropping the subscription on exit
/// deregisters it from the bus.
pub async fn run_stream(socket: WebSocket, mut subscription: Subscription) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let name = subscription.name().to_string();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(_))) => {
                        let reply = WsMessage::error(400, "stream is receive-only").to_json();
                        if let Some(json) = reply
                            && ws_tx.send(Message::text(json)).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    _ => {}
                }
            }
            // Envelope from the bus
            envelope = subscription.recv() => {
                let Some(envelope) = envelope else {
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: Utf8Bytes::from_static("quit"),
                    };
                    let _ = ws_tx.send(Message::Close(Some(frame))).await;
                    tracing::debug!(subscriber = %name, "stream ended by quit");
                    break;
                };
                let Some(json) = WsMessage::event(&envelope).to_json() else {
                    continue;
                };
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(subscriber = %name, "ws stream closed");
}
