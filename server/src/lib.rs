//! Docsync Server - reference collaboration endpoint.
//!
//! Accepts full-state document updates from docsync clients, keeps the latest
//! state per collab in memory, and answers each update with the server's
//! version vector so clients can tell whether they are caught up.

pub mod auth;
pub mod collab;
pub mod config;
pub mod error;
pub mod handlers;
mod routes;

use crate::collab::CollabStore;
use crate::config::Config;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub collabs: Arc<CollabStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            collabs: CollabStore::new_shared(),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
