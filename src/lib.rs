//! Team workspace synchronization core.
//!
//! Server side: a per-team file store sandboxed under a data directory,
//! exposed over five `/files` endpoints, plus a WebSocket relay for chat
//! and typing presence. Client side (under [`client`]): the virtual tree
//! model, editor session state, synchronization engine, and channel
//! session that mirror the store without a shared transaction boundary.

pub mod cli;
pub mod client;
pub mod files;
pub mod language;
pub mod path;
pub mod store;
pub mod teams;
pub mod ws;

use axum::{routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::WorkspaceStore;
use teams::TeamRegistry;
use tower_http::cors::CorsLayer;

async fn health_check() -> &'static str {
    "OK"
}

/// Configuration for creating a router.
pub struct RouterConfig {
    /// Directory under which each team's workspace root lives
    pub data_dir: PathBuf,
    /// Team membership and bearer tokens
    pub registry: Arc<TeamRegistry>,
    /// How long a typing presence entry lives without being refreshed
    pub presence_ttl: Duration,
}

impl RouterConfig {
    pub fn new(data_dir: impl Into<PathBuf>, registry: Arc<TeamRegistry>) -> Self {
        Self {
            data_dir: data_dir.into(),
            registry,
            presence_ttl: ws::room::DEFAULT_PRESENCE_TTL,
        }
    }
}

/// Create a router with the given configuration.
pub fn create_router(config: RouterConfig) -> Router {
    let store = WorkspaceStore::new(config.data_dir);

    Router::new()
        .route("/health", get(health_check))
        .merge(files::router(store, config.registry))
        .merge(ws::router(config.presence_ttl))
        .layer(CorsLayer::permissive())
}
