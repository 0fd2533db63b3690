//! Team room for coordinating realtime channel connections.
//!
//! A room relays chat and typing events between every connection viewing
//! the same team. Chat goes to all connections including the sender (one
//! consistent render path); typing presence goes to the other connections
//! only. The room also keeps a server-side view of who is typing, with a
//! per-entry deadline, so presence can be expired when a client goes away
//! without sending `stop typing`.

use super::connection::{ConnectionId, WsConnection};
use super::protocol::{ChannelEvent, ChatMessage, PresenceUser};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// How long a typing entry lives without being refreshed.
pub const DEFAULT_PRESENCE_TTL: Duration = Duration::from_secs(6);

/// One user currently typing, with the deadline after which the entry is
/// considered stale.
#[derive(Debug, Clone)]
struct TypingEntry {
    user: PresenceUser,
    deadline: Instant,
}

/// A room manages all channel connections viewing a single team.
pub struct Room {
    team_id: String,
    presence_ttl: Duration,
    connections: RwLock<HashMap<ConnectionId, Arc<RwLock<WsConnection>>>>,
    typing: RwLock<HashMap<String, TypingEntry>>,
}

impl Room {
    pub fn new(team_id: String, presence_ttl: Duration) -> Self {
        Self {
            team_id,
            presence_ttl,
            connections: RwLock::new(HashMap::new()),
            typing: RwLock::new(HashMap::new()),
        }
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// Add a connection to this room.
    pub async fn add_connection(&self, conn: Arc<RwLock<WsConnection>>) {
        let id = conn.read().await.id.clone();
        self.connections.write().await.insert(id, conn);
    }

    /// Remove a connection, clearing its typing presence if no other
    /// connection belongs to the same user. Receivers get a synthetic
    /// `stop typing` so a disconnect mid-type does not leak presence.
    pub async fn remove_connection(&self, conn_id: &str) {
        let removed = self.connections.write().await.remove(conn_id);
        let Some(removed) = removed else { return };
        let Some(user_id) = removed.read().await.user_id.clone() else {
            return;
        };

        let user_still_connected = {
            let connections = self.connections.read().await;
            let mut found = false;
            for conn in connections.values() {
                if conn.read().await.user_id.as_deref() == Some(&user_id) {
                    found = true;
                    break;
                }
            }
            found
        };
        if user_still_connected {
            return;
        }

        let entry = self.typing.write().await.remove(&user_id);
        if let Some(entry) = entry {
            debug!(team_id = %self.team_id, user_id = %user_id, "clearing presence on disconnect");
            self.broadcast_stop_typing(&entry.user).await;
        }
    }

    /// Get the number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Handle a chat message: relay to all connections, sender included.
    pub async fn handle_chat(&self, message: &ChatMessage) {
        match ChannelEvent::Chat(message.clone()).to_frame() {
            Ok(frame) => self.broadcast_all(frame).await,
            Err(e) => warn!(team_id = %self.team_id, "failed to encode chat frame: {}", e),
        }
    }

    /// Handle a typing signal: refresh the sender's presence deadline and
    /// relay to the other connections. De-duplicated by user id.
    pub async fn handle_typing(&self, from_conn_id: &str, user: &PresenceUser) {
        self.bind_user(from_conn_id, &user.user_id).await;
        self.typing.write().await.insert(
            user.user_id.clone(),
            TypingEntry {
                user: user.clone(),
                deadline: Instant::now() + self.presence_ttl,
            },
        );
        match ChannelEvent::Typing(user.clone()).to_frame() {
            Ok(frame) => self.broadcast_except(from_conn_id, frame).await,
            Err(e) => warn!(team_id = %self.team_id, "failed to encode typing frame: {}", e),
        }
    }

    /// Handle an explicit stop-typing signal.
    pub async fn handle_stop_typing(&self, from_conn_id: &str, user: &PresenceUser) {
        self.bind_user(from_conn_id, &user.user_id).await;
        self.typing.write().await.remove(&user.user_id);
        match ChannelEvent::StopTyping(user.clone()).to_frame() {
            Ok(frame) => self.broadcast_except(from_conn_id, frame).await,
            Err(e) => warn!(team_id = %self.team_id, "failed to encode stop-typing frame: {}", e),
        }
    }

    /// Expire typing entries whose deadline has passed, broadcasting a
    /// synthetic `stop typing` for each.
    pub async fn expire_presence(&self) {
        let now = Instant::now();
        let expired: Vec<PresenceUser> = {
            let mut typing = self.typing.write().await;
            let stale: Vec<String> = typing
                .iter()
                .filter(|(_, entry)| entry.deadline <= now)
                .map(|(user_id, _)| user_id.clone())
                .collect();
            stale
                .into_iter()
                .filter_map(|user_id| typing.remove(&user_id))
                .map(|entry| entry.user)
                .collect()
        };

        for user in expired {
            debug!(team_id = %self.team_id, user_id = %user.user_id, "expiring stale typing presence");
            self.broadcast_stop_typing(&user).await;
        }
    }

    /// Users the room currently believes are typing.
    pub async fn typing_users(&self) -> Vec<PresenceUser> {
        self.typing
            .read()
            .await
            .values()
            .map(|e| e.user.clone())
            .collect()
    }

    /// Remember which user a connection belongs to.
    async fn bind_user(&self, conn_id: &str, user_id: &str) {
        let connections = self.connections.read().await;
        if let Some(conn) = connections.get(conn_id) {
            conn.write().await.user_id = Some(user_id.to_string());
        }
    }

    async fn broadcast_stop_typing(&self, user: &PresenceUser) {
        match ChannelEvent::StopTyping(user.clone()).to_frame() {
            Ok(frame) => self.broadcast_all(frame).await,
            Err(e) => warn!(team_id = %self.team_id, "failed to encode stop-typing frame: {}", e),
        }
    }

    /// Broadcast a frame to all connections except one.
    pub async fn broadcast_except(&self, except_conn_id: &str, frame: String) {
        let connections = self.connections.read().await;
        for (conn_id, conn) in connections.iter() {
            if conn_id != except_conn_id {
                let conn = conn.read().await;
                // Non-blocking send, drop if buffer full
                let _ = conn.try_send_frame(frame.clone());
            }
        }
    }

    /// Broadcast a frame to all connections.
    pub async fn broadcast_all(&self, frame: String) {
        let connections = self.connections.read().await;
        for conn in connections.values() {
            let conn = conn.read().await;
            let _ = conn.try_send_frame(frame.clone());
        }
    }
}

/// Manager for all team rooms.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    presence_ttl: Duration,
}

impl RoomManager {
    pub fn new(presence_ttl: Duration) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            presence_ttl,
        }
    }

    /// Get or create a room for a team.
    pub async fn get_or_create_room(&self, team_id: &str) -> Arc<Room> {
        // Check with read lock first
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(team_id) {
                return room.clone();
            }
        }

        // Create with write lock
        let mut rooms = self.rooms.write().await;

        // Double-check
        if let Some(room) = rooms.get(team_id) {
            return room.clone();
        }

        let room = Arc::new(Room::new(team_id.to_string(), self.presence_ttl));
        rooms.insert(team_id.to_string(), room.clone());
        room
    }

    /// Remove empty rooms.
    pub async fn cleanup_empty_rooms(&self) {
        let mut rooms = self.rooms.write().await;
        let mut to_remove = Vec::new();

        for (team_id, room) in rooms.iter() {
            if room.connection_count().await == 0 {
                to_remove.push(team_id.clone());
            }
        }

        for team_id in to_remove {
            rooms.remove(&team_id);
        }
    }

    /// Get all rooms (for the presence reaper).
    pub async fn get_all_rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn room_with_conn(ttl: Duration) -> (Room, String, mpsc::Receiver<super::super::connection::OutgoingMessage>) {
        let room = Room::new("team-1".to_string(), ttl);
        let (tx, rx) = mpsc::channel(16);
        let conn = Arc::new(RwLock::new(WsConnection::new("team-1".to_string(), tx)));
        let conn_id = conn.read().await.id.clone();
        room.add_connection(conn).await;
        (room, conn_id, rx)
    }

    fn user(id: &str) -> PresenceUser {
        PresenceUser {
            user_id: id.to_string(),
            display_name: format!("User {}", id),
            avatar_initials: "U".to_string(),
        }
    }

    #[tokio::test]
    async fn repeated_typing_keeps_one_presence_entry() {
        let (room, conn_id, _rx) = room_with_conn(DEFAULT_PRESENCE_TTL).await;
        room.handle_typing(&conn_id, &user("u1")).await;
        room.handle_typing(&conn_id, &user("u1")).await;
        assert_eq!(room.typing_users().await.len(), 1);

        room.handle_stop_typing(&conn_id, &user("u1")).await;
        assert!(room.typing_users().await.is_empty());
    }

    #[tokio::test]
    async fn stale_presence_expires() {
        let (room, conn_id, _rx) = room_with_conn(Duration::from_millis(10)).await;
        room.handle_typing(&conn_id, &user("u1")).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        room.expire_presence().await;
        assert!(room.typing_users().await.is_empty());
    }

    #[tokio::test]
    async fn disconnect_clears_presence() {
        let (room, conn_id, _rx) = room_with_conn(DEFAULT_PRESENCE_TTL).await;
        room.handle_typing(&conn_id, &user("u1")).await;
        room.remove_connection(&conn_id).await;
        assert!(room.typing_users().await.is_empty());
    }
}
