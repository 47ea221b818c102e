//! Fetch handler - serves the stored state of a collab.

use crate::collab::CollabStore;
use crate::error::{AppError, Result};
use docsync_engine::CollabType;
use serde::{Deserialize, Serialize};

/// Stored collab as returned to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct CollabResponse {
    pub workspace_id: String,
    pub object_id: String,
    pub collab_type: CollabType,
    pub doc_state: Vec<u8>,
    pub version_vector: u64,
    pub update_count: u64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Look up one collab.
pub fn handle_fetch(
    store: &CollabStore,
    workspace_id: &str,
    object_id: &str,
) -> Result<CollabResponse> {
    let stored = store
        .get(workspace_id, object_id)
        .ok_or_else(|| AppError::NotFound(format!("collab {}/{}", workspace_id, object_id)))?;

    Ok(CollabResponse {
        workspace_id: workspace_id.to_string(),
        object_id: object_id.to_string(),
        collab_type: stored.collab_type,
        doc_state: stored.doc_state,
        version_vector: stored.version_vector,
        update_count: stored.update_count,
        updated_at: stored.updated_at,
    })
}
