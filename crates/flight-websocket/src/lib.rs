//! # Flight WebSocket Server
//!
//! Real-time WebSocket server for streaming flight lifecycle events to
//! dashboards. Supports:
//! - Broadcast to all connected clients
//! - Per-flight subscriptions
//! - Server heartbeats
//!
//! ## Protocol
//!
//! Messages are JSON-encoded using the types from `flight_core::events`:
//! - Server → Client: `ServerMessage`
//! - Client → Server: `ClientMessage`

pub mod error;
pub mod hub;

pub use error::{WsError, WsResult};
pub use hub::WebSocketHub;

use flight_core::{ClientMessage, ServerMessage};

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Interval between server heartbeats
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Start the WebSocket server
pub async fn start_server(hub: Arc<WebSocketHub>, port: u16) -> WsResult<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("🔌 WebSocket server listening on ws://{}", addr);
    serve(listener, hub).await
}

/// Accept connections on an already bound listener
pub async fn serve(listener: TcpListener, hub: Arc<WebSocketHub>) -> WsResult<()> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let hub = hub.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(hub, stream, addr).await {
                        error!("WebSocket connection error from {}: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept WebSocket connection: {}", e);
            }
        }
    }
}

/// Handle a single WebSocket connection
async fn handle_connection(
    hub: Arc<WebSocketHub>,
    stream: TcpStream,
    addr: SocketAddr,
) -> WsResult<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let client_id = Uuid::new_v4();
    info!("🔗 WebSocket client {} connected from {}", client_id, addr);

    let mut broadcast_rx = hub.register_client(client_id);

    let welcome = ServerMessage::Welcome {
        client_id: client_id.to_string(),
        active_flights: hub.active_flights(),
    };
    ws_sender
        .send(Message::Text(serde_json::to_string(&welcome)?.into()))
        .await?;

    let mut heartbeat = tokio::time::interval(PING_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(event) => {
                        if !hub.wants(client_id, &event) {
                            continue;
                        }
                        let json = serde_json::to_string(&ServerMessage::Event(event))?;
                        if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                            error!("Failed to send to client {}: {}", client_id, e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} lagged by {} messages", client_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcast channel closed");
                        break;
                    }
                }
            }
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_client_message(&hub, client_id, &text) {
                            warn!("Error handling client message: {}", e);
                            let reply = ServerMessage::Error {
                                code: "bad_message".to_string(),
                                message: e.to_string(),
                            };
                            ws_sender
                                .send(Message::Text(serde_json::to_string(&reply)?.into()))
                                .await?;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client {} closed the connection", client_id);
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Received unexpected binary message from {}", client_id);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Error receiving message from {}: {}", client_id, e);
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                let ping = ServerMessage::Ping {
                    timestamp: chrono::Utc::now().timestamp_millis(),
                };
                let text = serde_json::to_string(&ping)?;
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.unregister_client(client_id);
    info!("🔌 WebSocket client {} disconnected", client_id);

    Ok(())
}

/// Handle a message from a client
fn handle_client_message(hub: &WebSocketHub, client_id: Uuid, text: &str) -> WsResult<()> {
    if !hub.is_client_connected(client_id) {
        return Err(WsError::ClientNotFound(client_id.to_string()));
    }

    let msg: ClientMessage = serde_json::from_str(text)?;

    match msg {
        ClientMessage::Subscribe { flight_ids } => {
            debug!("Client {} subscribing to {:?}", client_id, flight_ids);
            hub.subscribe(client_id, flight_ids);
        }
        ClientMessage::Unsubscribe { flight_ids } => {
            debug!("Client {} unsubscribing from {:?}", client_id, flight_ids);
            hub.unsubscribe(client_id, flight_ids);
        }
        ClientMessage::Pong { timestamp } => {
            debug!("Client {} pong: {}", client_id, timestamp);
        }
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
