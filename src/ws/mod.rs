//! Realtime channel for chat and typing presence.
//!
//! One WebSocket route per team at `/ws/team/{team_id}`. The server relays
//! JSON text frames between connections viewing the same team and keeps a
//! per-room typing presence set with a liveness deadline, so a client that
//! disconnects mid-type does not leave a stale entry behind.

pub mod connection;
pub mod handler;
pub mod protocol;
pub mod room;

use axum::routing::get;
use axum::Router;
use handler::WsState;
use room::RoomManager;
use std::sync::Arc;
use std::time::Duration;

/// How often the presence reaper scans rooms for stale typing entries.
const REAP_INTERVAL: Duration = Duration::from_millis(500);

/// Create the realtime channel router and spawn the presence reaper.
pub fn router(presence_ttl: Duration) -> Router {
    let room_manager = Arc::new(RoomManager::new(presence_ttl));

    // Background task: expire typing entries that stopped being refreshed
    let reaper_manager = room_manager.clone();
    tokio::spawn(async move {
        presence_reaper(reaper_manager).await;
    });

    let state = WsState { room_manager };

    Router::new()
        .route("/ws/team/:team_id", get(handler::ws_handler))
        .with_state(state)
}

/// Background task that periodically expires stale typing presence.
async fn presence_reaper(room_manager: Arc<RoomManager>) {
    let mut tick = tokio::time::interval(REAP_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        for room in room_manager.get_all_rooms().await {
            room.expire_presence().await;
        }
    }
}
