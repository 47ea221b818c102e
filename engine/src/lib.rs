//! # Docsync Engine
//!
//! Client-side sync for collaborative documents.
//!
//! This crate keeps a locally edited CRDT document in step with a single
//! remote authority across flaky networks and process restarts. The document
//! itself, its merge algorithm, and the server are collaborators reached
//! through traits; what lives here is the bookkeeping that guarantees local
//! changes eventually reach the server and that the client can always tell
//! whether they have.
//!
//! ## Core Concepts
//!
//! ### Sync Context
//!
//! A [`SyncContext`] identifies one document: user, workspace, object, and
//! [`CollabType`]. It namespaces persisted state and addresses the endpoint.
//!
//! ### Persisted Scalars
//!
//! Each document carries three values through a [`ScalarStore`]:
//! - the version vector, a counter bumped before every send attempt
//! - the unsynced flag, true until a send is acknowledged with the same counter
//! - the last-synced marker, for display
//!
//! ### Sync Manager
//!
//! The [`SyncManager`] subscribes to a [`ChangeSource`], debounces local
//! mutations by a quiet period (one second by default), and sends the full
//! document state through a [`CollabTransport`]. At most one send is in flight.
//! Remote-origin mutations are ignored.
//!
//! ## Quick Start
//!
//! ```rust
//! use docsync_engine::{
//!     CollabType, MemoryDoc, MemoryStore, MockTransport, SyncConfig, SyncContext, SyncManager,
//! };
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> docsync_engine::error::Result<()> {
//! let doc = MemoryDoc::new();
//! let context = SyncContext::new("user-1", "workspace-1", "doc-1", CollabType::Document);
//! let config = SyncConfig::new().with_quiet_period(Duration::from_millis(10));
//!
//! let sync = SyncManager::new(doc.clone(), context, MemoryStore::new(), MockTransport::new(), config)?;
//! sync.initialize()?;
//!
//! doc.apply_local(b"hello".to_vec());
//! tokio::time::sleep(Duration::from_millis(50)).await;
//!
//! assert_eq!(sync.version_vector(), 1);
//! assert!(!sync.has_unsynced_changes());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod debounce;
pub mod error;
pub mod http;
pub mod manager;
pub mod source;
pub mod state;
pub mod store;
pub mod transport;

// Re-export main types at crate root
pub use config::{HttpConfig, SyncConfig, DEFAULT_QUIET_PERIOD};
pub use context::{CollabType, SyncContext};
pub use debounce::Debouncer;
pub use error::Error;
pub use http::{update_path, HttpTransport, UpdateCollabBody};
pub use manager::{SyncManager, SyncPhase, SyncStatus};
pub use source::{ChangeSource, MemoryDoc, MutationHandler, Origin, Subscription};
pub use state::{PersistedState, StateStore};
pub use store::{FileStore, MemoryStore, ScalarStore};
pub use transport::{CollabContext, CollabTransport, MockReply, MockTransport, UpdateCollabRequest};
