//! Transport abstraction for the remote collaboration endpoint.

use crate::context::CollabType;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Version bookkeeping exchanged with the endpoint.
///
/// Sent with every update and echoed back by the server with its own view of
/// the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollabContext {
    pub version_vector: u64,
}

/// One outbound update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCollabRequest {
    pub workspace_id: String,
    pub object_id: String,
    pub collab_type: CollabType,
    /// Full encoded document state.
    pub doc_state: Vec<u8>,
    pub context: CollabContext,
}

/// The remote endpoint that accepts document updates.
///
/// `Ok(Some(_))` is a response carrying the server's counter. `Ok(None)` is
/// an empty response, which callers treat as a failed send.
pub trait CollabTransport: Send + Sync + 'static {
    fn update_collab(
        &self,
        request: UpdateCollabRequest,
    ) -> impl Future<Output = Result<Option<CollabContext>>> + Send;
}

impl<T: CollabTransport> CollabTransport for Arc<T> {
    fn update_collab(
        &self,
        request: UpdateCollabRequest,
    ) -> impl Future<Output = Result<Option<CollabContext>>> + Send {
        (**self).update_collab(request)
    }
}

/// Scripted outcome for one [`MockTransport`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Respond with the version vector the client sent.
    Echo,
    /// Respond with a fixed version vector.
    Version(u64),
    /// Respond with nothing.
    Empty,
    /// Fail with a transport error.
    Fail(String),
}

/// A transport for tests.
///
/// Replies are consumed in order; once the script runs out every call echoes
/// the sent counter. [`MockTransport::hold`] keeps calls pending until
/// [`MockTransport::release`] is called.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<UpdateCollabRequest>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    /// Create a transport that echoes every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next unanswered call.
    pub fn push_reply(&self, reply: MockReply) {
        self.replies.lock().push_back(reply);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<UpdateCollabRequest> {
        self.requests.lock().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Calls that have started but not yet returned.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Make subsequent calls wait for [`MockTransport::release`].
    pub fn hold(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held call complete.
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(1);
        }
    }

    /// Stop holding calls and let all waiting ones complete.
    pub fn open(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.close();
        }
    }
}

impl CollabTransport for MockTransport {
    async fn update_collab(&self, request: UpdateCollabRequest) -> Result<Option<CollabContext>> {
        let sent = request.context.version_vector;
        self.requests.lock().push(request);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            // A closed gate means the transport was opened again.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let reply = self.replies.lock().pop_front().unwrap_or(MockReply::Echo);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            MockReply::Echo => Ok(Some(CollabContext {
                version_vector: sent,
            })),
            MockReply::Version(version_vector) => Ok(Some(CollabContext { version_vector })),
            MockReply::Empty => Ok(None),
            MockReply::Fail(message) => Err(Error::transport(message)),
        }
    }
}
