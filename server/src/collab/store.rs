//! In-memory collab storage.
//!
//! Holds the latest full document state per `(workspace_id, object_id)` and
//! the server's version vector for it. Thread-safe and shared across handlers
//! via `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use docsync_engine::CollabType;

/// Key of a stored collab.
pub type CollabKey = (String, String);

/// Latest known state of one collab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCollab {
    pub collab_type: CollabType,
    /// Last full state received
    pub doc_state: Vec<u8>,
    /// Highest version vector any writer has sent
    pub version_vector: u64,
    /// Number of updates applied
    pub update_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// Why an update was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The object already exists with another kind.
    TypeMismatch {
        stored: CollabType,
        incoming: CollabType,
    },
}

/// All collabs known to this server.
#[derive(Debug, Default)]
pub struct CollabStore {
    collabs: DashMap<CollabKey, StoredCollab>,
}

impl CollabStore {
    pub fn new() -> Self {
        Self {
            collabs: DashMap::new(),
        }
    }

    /// Create a new store wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Replace the stored state with `doc_state`.
    ///
    /// The stored version vector only moves forward; it is returned so the
    /// writer can tell whether someone else got ahead of it.
    pub fn apply_update(
        &self,
        workspace_id: &str,
        object_id: &str,
        collab_type: CollabType,
        doc_state: Vec<u8>,
        version_vector: u64,
    ) -> Result<u64, ApplyError> {
        let key = (workspace_id.to_string(), object_id.to_string());
        let now = Utc::now();

        let mut entry = self.collabs.entry(key).or_insert_with(|| StoredCollab {
            collab_type,
            doc_state: Vec::new(),
            version_vector: 0,
            update_count: 0,
            updated_at: now,
        });

        if entry.collab_type != collab_type {
            return Err(ApplyError::TypeMismatch {
                stored: entry.collab_type,
                incoming: collab_type,
            });
        }

        entry.doc_state = doc_state;
        entry.version_vector = entry.version_vector.max(version_vector);
        entry.update_count += 1;
        entry.updated_at = now;

        tracing::debug!(
            workspace_id = %workspace_id,
            object_id = %object_id,
            incoming = version_vector,
            server = entry.version_vector,
            "Applied collab update"
        );

        Ok(entry.version_vector)
    }

    /// Get a copy of a stored collab.
    pub fn get(&self, workspace_id: &str, object_id: &str) -> Option<StoredCollab> {
        self.collabs
            .get(&(workspace_id.to_string(), object_id.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of stored collabs.
    pub fn len(&self) -> usize {
        self.collabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collabs.is_empty()
    }
}
