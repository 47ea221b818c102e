//! Collab endpoint routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use docsync_engine::{CollabContext, UpdateCollabBody};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_fetch, handle_update, CollabResponse};
use crate::AppState;

/// Create collab routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/workspace/{workspace_id}/collab/{object_id}",
            get(fetch_handler),
        )
        .route(
            "/api/workspace/{workspace_id}/collab/{object_id}/web-update",
            post(update_handler),
        )
}

/// POST .../web-update - Apply a full-state update.
async fn update_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((workspace_id, object_id)): Path<(String, String)>,
    Json(body): Json<UpdateCollabBody>,
) -> Result<Json<CollabContext>> {
    let response = handle_update(&state.collabs, &workspace_id, &object_id, body)?;
    Ok(Json(response))
}

/// GET .../collab/{object_id} - Read the stored collab.
async fn fetch_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((workspace_id, object_id)): Path<(String, String)>,
) -> Result<Json<CollabResponse>> {
    let response = handle_fetch(&state.collabs, &workspace_id, &object_id)?;
    Ok(Json(response))
}
