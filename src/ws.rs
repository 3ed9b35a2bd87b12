//! WebSocket push channel.
//!
//! Authenticated clients connect to `/ws` and receive the serialized
//! notification events published through [`crate::notify::Notifier`]. The
//! channel is one-way: the server pings for keepalive and drops sockets
//! that stop answering; client text frames are ignored.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::api::SharedState;
use crate::auth::Actor;

/// How often the server pings each socket.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);
/// How long a socket may go without a pong before it is dropped.
pub const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Upgrade handler. The [`Actor`] extractor runs first and rejects the
/// request with 401 before the upgrade when no valid token is presented.
pub async fn ws_handler(
    actor: Actor,
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let rx = state.notifier.subscribe();
    tracing::info!("WebSocket client connected (person {})", actor.person_id);
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, rx: broadcast::Receiver<String>) {
    let (sender, receiver) = socket.split();
    run_socket_loop(sender, receiver, rx).await;
}

/// Core socket loop with ping/pong keepalive.
///
/// Combines broadcast forwarding, client frame handling, and periodic
/// pinging into a single select loop. If no Pong arrives within
/// [`PONG_TIMEOUT`] of a Ping, the connection is considered dead.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<String>,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately; consume it so the first real
    // ping fires after PING_INTERVAL has elapsed.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    tracing::debug!("WebSocket client unresponsive, dropping");
                    break;
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            event = rx.recv() => {
                match event {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Slow consumer fell behind the channel; skip the gap.
                        continue;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Nothing flows client-to-server on this channel.
                    }
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // Best effort; the peer may already be gone.
    let _ = sender.send(Message::Close(None)).await;
    tracing::debug!("WebSocket client disconnected");
}
