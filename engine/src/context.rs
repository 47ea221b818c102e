//! Identity of a synced document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of collaborative object being synced.
///
/// Sent to the remote endpoint so it can route the update to the right
/// collab storage. The engine itself treats every kind the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollabType {
    Document,
    Database,
    WorkspaceDatabase,
    Folder,
    DatabaseRow,
    UserAwareness,
    Empty,
}

impl CollabType {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollabType::Document => "document",
            CollabType::Database => "database",
            CollabType::WorkspaceDatabase => "workspace_database",
            CollabType::Folder => "folder",
            CollabType::DatabaseRow => "database_row",
            CollabType::UserAwareness => "user_awareness",
            CollabType::Empty => "empty",
        }
    }
}

impl fmt::Display for CollabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identity tuple for one synced document session.
///
/// Namespaces the persisted scalars and addresses the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncContext {
    user_id: String,
    workspace_id: String,
    object_id: String,
    collab_type: CollabType,
}

impl SyncContext {
    pub fn new(
        user_id: impl Into<String>,
        workspace_id: impl Into<String>,
        object_id: impl Into<String>,
        collab_type: CollabType,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_id: workspace_id.into(),
            object_id: object_id.into(),
            collab_type,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn collab_type(&self) -> CollabType {
        self.collab_type
    }

    /// Build the store key for one persisted field of this document.
    ///
    /// Layout: `{user_id}_{field}_{workspace_id}_{object_id}`.
    pub fn storage_key(&self, field: &str) -> String {
        format!(
            "{}_{}_{}_{}",
            self.user_id, field, self.workspace_id, self.object_id
        )
    }
}
