//! Update handler - applies full-state document updates from clients.

use crate::collab::{ApplyError, CollabStore};
use crate::error::{AppError, Result};
use docsync_engine::{CollabContext, UpdateCollabBody};

/// Apply one client update and report the server's version vector.
pub fn handle_update(
    store: &CollabStore,
    workspace_id: &str,
    object_id: &str,
    body: UpdateCollabBody,
) -> Result<CollabContext> {
    if workspace_id.is_empty() || object_id.is_empty() {
        return Err(AppError::BadRequest(
            "workspace and object ids must not be empty".to_string(),
        ));
    }

    let version_vector = store
        .apply_update(
            workspace_id,
            object_id,
            body.collab_type,
            body.doc_state,
            body.context.version_vector,
        )
        .map_err(|e| match e {
            ApplyError::TypeMismatch { stored, incoming } => AppError::Conflict(format!(
                "object {} is a {}, not a {}",
                object_id, stored, incoming
            )),
        })?;

    Ok(CollabContext { version_vector })
}
