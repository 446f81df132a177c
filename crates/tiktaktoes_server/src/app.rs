//! Shared application state and router assembly.

use crate::config::ServerConfig;
use crate::hub::FanoutHub;
use crate::session::{Session, SessionStore};
use crate::{api, sse, ws};
use axum::Router;
use axum::routing::get;
use tracing::{debug, instrument};

/// Handles shared by every transport adapter.
///
/// The store and hub are independent: adapters mutate through the store,
/// then hand the returned snapshot to the hub.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session store.
    pub store: SessionStore,
    /// Observer registry.
    pub hub: FanoutHub,
}

impl AppState {
    /// Builds state from explicit parts.
    pub fn new(store: SessionStore, hub: FanoutHub) -> Self {
        Self { store, hub }
    }

    /// Builds state from configuration.
    #[instrument(skip(config))]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            SessionStore::new(*config.reset_policy()),
            FanoutHub::new(*config.push_buffer()),
        )
    }

    /// Pushes a snapshot to every observer of its session.
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub fn publish(&self, session: &Session) {
        let delivered = self.hub.broadcast(session.id(), session);
        debug!(delivered, "Published snapshot");
    }
}

/// Builds the HTTP router for all transports.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/game", get(api::list_games).post(api::create_game))
        .route(
            "/api/game/{id}",
            get(api::get_game).post(api::make_move).put(api::reset_game),
        )
        .route("/api/game/{id}/join", axum::routing::post(api::join_game))
        .route("/ws/{id}", get(ws::ws_handler))
        .route("/sse/{id}", get(sse::sse_handler))
        .with_state(state)
}
