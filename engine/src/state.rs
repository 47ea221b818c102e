//! Persisted sync scalars and their store adapter.
//!
//! Three values per document outlive a session: the local version counter,
//! the unsynced-changes flag, and the last-synced marker. They round-trip
//! through plain strings so any key/value backend can hold them.

use crate::context::SyncContext;
use crate::error::Result;
use crate::store::ScalarStore;
use serde::{Deserialize, Serialize};

/// Field name of the local version counter.
pub const VERSION_VECTOR_KEY: &str = "ydoc_version_vector";
/// Field name of the unsynced-changes flag.
pub const UNSYNCED_FLAG_KEY: &str = "ydoc_unsynced_changes";
/// Field name of the last-synced marker.
pub const LAST_SYNCED_AT_KEY: &str = "ydoc_last_synced_at";

/// In-memory mirror of the persisted scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Send-attempt counter. Never decreases.
    pub version_vector: u64,
    /// True while local state may not be reflected on the server.
    pub has_unsynced_changes: bool,
    /// Epoch millis of the last received response, or empty.
    pub last_synced_at: String,
}

/// Reads and writes [`PersistedState`] fields for one [`SyncContext`].
pub struct StateStore<S> {
    store: S,
    version_key: String,
    unsynced_key: String,
    synced_at_key: String,
}

impl<S: ScalarStore> StateStore<S> {
    /// Bind a store to a document's key namespace.
    pub fn new(store: S, context: &SyncContext) -> Self {
        Self {
            store,
            version_key: context.storage_key(VERSION_VECTOR_KEY),
            unsynced_key: context.storage_key(UNSYNCED_FLAG_KEY),
            synced_at_key: context.storage_key(LAST_SYNCED_AT_KEY),
        }
    }

    /// Load all three scalars, applying defaults for absent or unreadable values.
    pub fn load(&self) -> Result<PersistedState> {
        Ok(PersistedState {
            version_vector: parse_version_vector(self.store.get(&self.version_key)?.as_deref()),
            has_unsynced_changes: parse_flag(self.store.get(&self.unsynced_key)?.as_deref()),
            last_synced_at: self.store.get(&self.synced_at_key)?.unwrap_or_default(),
        })
    }

    pub fn save_version_vector(&self, version_vector: u64) -> Result<()> {
        self.store
            .set(&self.version_key, &version_vector.to_string())
    }

    pub fn save_unsynced_flag(&self, has_unsynced_changes: bool) -> Result<()> {
        self.store.set(
            &self.unsynced_key,
            if has_unsynced_changes { "true" } else { "false" },
        )
    }

    pub fn save_last_synced_at(&self, last_synced_at: &str) -> Result<()> {
        self.store.set(&self.synced_at_key, last_synced_at)
    }
}

/// Decimal text, leading whitespace tolerated; anything else reads as zero.
/// Values past `u64::MAX` saturate so the counter never moves backwards.
fn parse_version_vector(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return 0;
    };

    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        tracing::warn!(value = %raw, "Unreadable version vector in store, starting from 0");
        return 0;
    }

    match digits.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(value = %raw, "Version vector out of range, saturating");
            u64::MAX
        }
    }
}

/// Only the literal `"true"` is true.
fn parse_flag(raw: Option<&str>) -> bool {
    raw == Some("true")
}
