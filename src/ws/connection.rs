//! Per-connection state for realtime channel connections.

use std::time::Instant;
use tokio::sync::mpsc;

/// Unique connection ID.
pub type ConnectionId = String;

/// Per-connection state.
#[derive(Debug)]
pub struct WsConnection {
    /// Unique connection ID (server-generated UUID)
    pub id: ConnectionId,

    /// Team this connection is viewing
    pub team_id: String,

    /// User id learned from the first event carrying one; used to clear
    /// presence on disconnect
    pub user_id: Option<String>,

    /// Last activity timestamp (for timeout detection)
    pub last_activity: Instant,

    /// Sender for outgoing messages to this connection
    pub sender: mpsc::Sender<OutgoingMessage>,
}

/// Outgoing message to send to a channel client.
#[derive(Debug, Clone)]
pub enum OutgoingMessage {
    /// JSON text frame
    Frame(String),
    /// Close the connection
    Close,
}

impl WsConnection {
    /// Create a new connection.
    pub fn new(team_id: String, sender: mpsc::Sender<OutgoingMessage>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            team_id,
            user_id: None,
            last_activity: Instant::now(),
            sender,
        }
    }

    /// Update last activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Send a message to this connection (non-blocking).
    /// Returns false if the channel is full or closed.
    pub fn try_send(&self, msg: OutgoingMessage) -> bool {
        self.sender.try_send(msg).is_ok()
    }

    /// Send a text frame.
    pub fn try_send_frame(&self, frame: String) -> bool {
        self.try_send(OutgoingMessage::Frame(frame))
    }
}
