//! Change sources - the documents a sync manager observes.
//!
//! A [`ChangeSource`] is the CRDT document seen from the outside: it reports
//! every mutation together with its [`Origin`], and it can encode its full
//! state at any time. The merge algorithm behind it is not our concern.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Origin of a document mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Caused by a local user action
    Local,
    /// Applied while merging an update from the server
    Remote,
}

/// Callback invoked with `(update_bytes, origin)` on every mutation.
pub type MutationHandler = Arc<dyn Fn(&[u8], Origin) + Send + Sync>;

/// Handle for a registered mutation listener.
///
/// Dropping the handle unregisters the listener.
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap an unregister callback.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregister the listener now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A mutable replicated document.
pub trait ChangeSource: Send + Sync {
    /// Register a mutation listener.
    fn subscribe(&self, handler: MutationHandler) -> Subscription;

    /// Encode the full current state as a binary update.
    fn encode_snapshot(&self) -> Vec<u8>;
}

impl<C: ChangeSource + ?Sized> ChangeSource for Arc<C> {
    fn subscribe(&self, handler: MutationHandler) -> Subscription {
        (**self).subscribe(handler)
    }

    fn encode_snapshot(&self) -> Vec<u8> {
        (**self).encode_snapshot()
    }
}

#[derive(Default)]
struct DocInner {
    updates: Mutex<Vec<Vec<u8>>>,
    listeners: Mutex<Vec<(u64, MutationHandler)>>,
    next_listener: AtomicU64,
}

/// An in-memory document that keeps every update it has seen.
///
/// Its snapshot is the ordered list of updates, each prefixed with its length
/// as a little-endian `u32`. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryDoc {
    inner: Arc<DocInner>,
}

impl MemoryDoc {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an update made by the local user.
    pub fn apply_local(&self, update: impl Into<Vec<u8>>) {
        self.apply(update.into(), Origin::Local);
    }

    /// Apply an update received from the server.
    pub fn apply_remote(&self, update: impl Into<Vec<u8>>) {
        self.apply(update.into(), Origin::Remote);
    }

    /// All updates applied so far, in order.
    pub fn updates(&self) -> Vec<Vec<u8>> {
        self.inner.updates.lock().clone()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn apply(&self, update: Vec<u8>, origin: Origin) {
        self.inner.updates.lock().push(update.clone());

        // Listeners run outside the lock so they may touch the document.
        let listeners: Vec<MutationHandler> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in listeners {
            handler(&update, origin);
        }
    }
}

impl ChangeSource for MemoryDoc {
    fn subscribe(&self, handler: MutationHandler) -> Subscription {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, handler));

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.lock().retain(|(listener, _)| *listener != id);
            }
        })
    }

    fn encode_snapshot(&self) -> Vec<u8> {
        let updates = self.inner.updates.lock();
        let mut out = Vec::with_capacity(updates.iter().map(|u| u.len() + 4).sum());
        for update in updates.iter() {
            out.extend_from_slice(&(update.len() as u32).to_le_bytes());
            out.extend_from_slice(update);
        }
        out
    }
}

impl std::fmt::Debug for MemoryDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDoc")
            .field("updates", &self.inner.updates.lock().len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
