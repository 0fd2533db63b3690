//! Realtime channel connection handlers.

use super::connection::{OutgoingMessage, WsConnection};
use super::protocol::ChannelEvent;
use super::room::RoomManager;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

/// Keep-alive ping interval (30 seconds)
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for considering a connection dead (90 seconds = 3 missed pings)
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);

/// Channel state shared across handlers.
#[derive(Clone)]
pub struct WsState {
    pub room_manager: Arc<RoomManager>,
}

/// Handle WebSocket upgrade request for a team channel.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
    Path(team_id): Path<String>,
) -> impl IntoResponse {
    let room = state.room_manager.get_or_create_room(&team_id).await;
    info!(team_id = %team_id, "channel upgrade request");
    ws.on_upgrade(move |socket| handle_socket(socket, state, team_id, room))
}

/// Handle an established channel connection.
async fn handle_socket(
    mut socket: WebSocket,
    state: WsState,
    team_id: String,
    room: Arc<super::room::Room>,
) {
    // Create channel for outgoing messages (bounded for backpressure)
    let (tx, mut rx) = mpsc::channel::<OutgoingMessage>(256);

    let conn = Arc::new(RwLock::new(WsConnection::new(team_id.clone(), tx)));
    let conn_id = conn.read().await.id.clone();
    info!(conn_id = %conn_id, team_id = %team_id, "channel connected");

    room.add_connection(conn.clone()).await;

    // Keep-alive ping interval
    let mut ping_interval = interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Handle outgoing messages from channel
            Some(msg) = rx.recv() => {
                let ws_msg = match msg {
                    OutgoingMessage::Frame(frame) => Message::Text(frame),
                    OutgoingMessage::Close => {
                        let _ = socket.close().await;
                        break;
                    }
                };
                if let Err(e) = socket.send(ws_msg).await {
                    debug!("failed to send channel message: {}", e);
                    break;
                }
            }

            // Keep-alive ping
            _ = ping_interval.tick() => {
                let last_activity = conn.read().await.last_activity;
                if last_activity.elapsed() > CONNECTION_TIMEOUT {
                    warn!(conn_id = %conn_id, "connection timed out (no activity for {:?})", CONNECTION_TIMEOUT);
                    let _ = socket.close().await;
                    break;
                }

                if let Err(e) = socket.send(Message::Ping(vec![])).await {
                    debug!(conn_id = %conn_id, "failed to send ping: {}", e);
                    break;
                }
            }

            // Handle incoming messages
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(frame))) => {
                        conn.write().await.touch();
                        handle_frame(&conn_id, &frame, &room).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        // The channel protocol is JSON text only
                        debug!(conn_id = %conn_id, "ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Pong is handled automatically by axum
                        conn.write().await.touch();
                    }
                    Some(Ok(Message::Pong(_))) => {
                        conn.write().await.touch();
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(conn_id = %conn_id, "client initiated close");
                        break;
                    }
                    Some(Err(e)) => {
                        error!(conn_id = %conn_id, "channel error: {}", e);
                        break;
                    }
                    None => {
                        info!(conn_id = %conn_id, "channel stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup
    info!(conn_id = %conn_id, team_id = %team_id, "channel disconnected");
    room.remove_connection(&conn_id).await;
    state.room_manager.cleanup_empty_rooms().await;
}

/// Dispatch one decoded frame to the room.
async fn handle_frame(conn_id: &str, frame: &str, room: &Arc<super::room::Room>) {
    let event = match ChannelEvent::from_frame(frame) {
        Ok(event) => event,
        Err(e) => {
            warn!(conn_id = %conn_id, "ignoring malformed frame: {}", e);
            return;
        }
    };

    match event {
        ChannelEvent::Chat(message) => {
            debug!(conn_id = %conn_id, user_id = %message.user_id, "chat message");
            room.handle_chat(&message).await;
        }
        ChannelEvent::Typing(user) => {
            room.handle_typing(conn_id, &user).await;
        }
        ChannelEvent::StopTyping(user) => {
            room.handle_stop_typing(conn_id, &user).await;
        }
    }
}
