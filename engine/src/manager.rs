//! Sync manager - ships local document changes to the collaboration endpoint.
//!
//! One manager is bound to one open document session. It listens to the
//! document, debounces bursts of local mutations, sends full-state snapshots
//! with a per-document send counter, and keeps three scalars persisted so a
//! later session can resume an unfinished sync.
//!
//! ## Event loop
//!
//! Mutation notifications and `initialize` requests flow through a channel
//! into a single driver task that owns the [`Debouncer`]. When the quiet
//! period elapses the driver marks the document unsynced and starts a send.
//! Sends run on their own task so mutations keep being observed while a
//! request is outstanding; at most one send runs at a time and a send
//! attempted while another is in flight is dropped.
//!
//! ## Failure handling
//!
//! Nothing from the send path is returned to callers. Transport errors, empty
//! responses, and counter mismatches all leave the unsynced flag set; the next
//! local edit or the next session's [`SyncManager::initialize`] retries.

use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::debounce::{self, Debouncer};
use crate::error::{Error, Result};
use crate::source::{ChangeSource, MutationHandler, Origin, Subscription};
use crate::state::{PersistedState, StateStore};
use crate::store::ScalarStore;
use crate::transport::{CollabContext, CollabTransport, UpdateCollabRequest};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Where the manager is in its send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No timer armed and no send outstanding.
    Idle,
    /// Debounce timer armed.
    PendingSend,
    /// A send is in flight.
    Sending,
}

/// Point-in-time view of a manager's state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncStatus {
    /// Local state may not be reflected on the server.
    pub has_unsynced_changes: bool,
    /// Send-attempt counter.
    pub version_vector: u64,
    /// Epoch millis of the last response, or empty.
    pub last_synced_at: String,
    sending: bool,
    pending: bool,
}

impl SyncStatus {
    fn from_persisted(state: PersistedState) -> Self {
        Self {
            has_unsynced_changes: state.has_unsynced_changes,
            version_vector: state.version_vector,
            last_synced_at: state.last_synced_at,
            sending: false,
            pending: false,
        }
    }

    /// Current state-machine phase. An outstanding send wins over an armed timer.
    pub fn phase(&self) -> SyncPhase {
        if self.sending {
            SyncPhase::Sending
        } else if self.pending {
            SyncPhase::PendingSend
        } else {
            SyncPhase::Idle
        }
    }
}

enum Event {
    /// Arm (or re-arm) the debounce timer.
    Schedule,
}

/// State shared between the handle, the driver, and send tasks.
struct Shared<C, S, T> {
    context: SyncContext,
    source: C,
    transport: T,
    state: StateStore<S>,
    /// Held across a store write and the status update that mirrors it.
    persist: Mutex<()>,
    status: watch::Sender<SyncStatus>,
}

impl<C, S, T> Shared<C, S, T>
where
    C: ChangeSource + 'static,
    S: ScalarStore + 'static,
    T: CollabTransport,
{
    fn set_pending(&self, pending: bool) {
        self.status.send_if_modified(|status| {
            let changed = status.pending != pending;
            status.pending = pending;
            changed
        });
    }

    /// Debounce fired: record that local changes exist.
    fn mark_unsynced(&self) {
        let _persist = self.persist.lock();
        self.persist_flag(true);
        self.status
            .send_modify(|status| status.has_unsynced_changes = true);
    }

    /// Take the in-flight guard and bump the counter.
    ///
    /// Returns the counter to send with, or `None` if a send is already
    /// outstanding or the counter is exhausted. The counter is persisted
    /// before this returns.
    fn try_begin_send(&self) -> Option<u64> {
        let _persist = self.persist.lock();

        let (sending, current) = {
            let status = self.status.borrow();
            (status.sending, status.version_vector)
        };
        if sending {
            tracing::debug!(
                object_id = %self.context.object_id(),
                "Send already in flight, dropping attempt"
            );
            return None;
        }
        let Some(next) = current.checked_add(1) else {
            tracing::error!(
                object_id = %self.context.object_id(),
                version_vector = current,
                "Version vector exhausted, dropping attempt"
            );
            return None;
        };

        if let Err(e) = self.state.save_version_vector(next) {
            tracing::warn!(error = %e, "Failed to persist version vector");
        }
        self.status.send_modify(|status| {
            status.sending = true;
            status.version_vector = next;
        });
        Some(next)
    }

    fn end_send(&self) {
        self.status.send_modify(|status| status.sending = false);
    }

    fn start_send(self: &Arc<Self>) {
        let Some(version_vector) = self.try_begin_send() else {
            return;
        };

        let shared = Arc::clone(self);
        tokio::spawn(async move { shared.send(version_vector).await });
    }

    async fn send(&self, version_vector: u64) {
        let _guard = InFlightGuard(self);

        let request = UpdateCollabRequest {
            workspace_id: self.context.workspace_id().to_string(),
            object_id: self.context.object_id().to_string(),
            collab_type: self.context.collab_type(),
            doc_state: self.source.encode_snapshot(),
            context: CollabContext { version_vector },
        };

        tracing::debug!(
            object_id = %request.object_id,
            version_vector,
            len = request.doc_state.len(),
            "Sending update"
        );

        match self.transport.update_collab(request).await {
            Ok(Some(response)) => self.on_response(version_vector, response),
            Ok(None) => self.on_failure(version_vector, &Error::transport("empty response")),
            Err(e) => self.on_failure(version_vector, &e),
        }
    }

    fn on_response(&self, sent: u64, response: CollabContext) {
        let synced_at = chrono::Utc::now().timestamp_millis().to_string();
        let caught_up = response.version_vector == sent;

        {
            let _persist = self.persist.lock();
            if let Err(e) = self.state.save_last_synced_at(&synced_at) {
                tracing::warn!(error = %e, "Failed to persist last synced time");
            }
            self.persist_flag(!caught_up);
            self.status.send_modify(|status| {
                status.last_synced_at = synced_at;
                status.has_unsynced_changes = !caught_up;
            });
        }

        if caught_up {
            tracing::info!(
                object_id = %self.context.object_id(),
                version_vector = sent,
                "Local changes fully synced"
            );
        } else {
            tracing::info!(
                object_id = %self.context.object_id(),
                sent,
                server = response.version_vector,
                "Server version differs, changes remain unsynced"
            );
        }
    }

    fn on_failure(&self, sent: u64, error: &Error) {
        tracing::warn!(
            object_id = %self.context.object_id(),
            version_vector = sent,
            error = %error,
            "Failed to send update"
        );

        let _persist = self.persist.lock();
        self.persist_flag(true);
        self.status
            .send_modify(|status| status.has_unsynced_changes = true);
    }

    fn persist_flag(&self, has_unsynced_changes: bool) {
        if let Err(e) = self.state.save_unsynced_flag(has_unsynced_changes) {
            tracing::warn!(error = %e, "Failed to persist unsynced flag");
        }
    }
}

/// Releases the in-flight guard when a send ends, however it ends.
struct InFlightGuard<'a, C, S, T>(&'a Shared<C, S, T>)
where
    C: ChangeSource + 'static,
    S: ScalarStore + 'static,
    T: CollabTransport;

impl<C, S, T> Drop for InFlightGuard<'_, C, S, T>
where
    C: ChangeSource + 'static,
    S: ScalarStore + 'static,
    T: CollabTransport,
{
    fn drop(&mut self) {
        self.0.end_send();
    }
}

async fn drive<C, S, T>(
    shared: Arc<Shared<C, S, T>>,
    mut events: mpsc::UnboundedReceiver<Event>,
    mut debouncer: Debouncer,
) where
    C: ChangeSource + 'static,
    S: ScalarStore + 'static,
    T: CollabTransport,
{
    loop {
        let deadline = debouncer.deadline();

        tokio::select! {
            // A mutation arriving at the deadline still resets the timer.
            biased;

            event = events.recv() => match event {
                Some(Event::Schedule) => {
                    debouncer.arm(Instant::now());
                    shared.set_pending(true);
                }
                None => break,
            },

            _ = debounce::sleep_until(deadline), if debouncer.is_armed() => {
                if debouncer.fire(Instant::now()) {
                    shared.set_pending(false);
                    shared.mark_unsynced();
                    shared.start_send();
                }
            }
        }
    }

    shared.set_pending(false);
    tracing::debug!(object_id = %shared.context.object_id(), "Sync manager event loop stopped");
}

/// Keeps one document in sync with the collaboration endpoint.
///
/// Must be created inside a tokio runtime; it spawns its event loop there.
///
/// # Unsynced flag caveat
///
/// [`SyncManager::has_unsynced_changes`] can read `false` while an edit is
/// still outstanding. When an edit's quiet period ends during a send, that
/// attempt is dropped, and a matching response to the in-flight send then
/// clears the flag even though the request carried the older snapshot. The
/// flag stays cleared until the next local edit's quiet period ends, so
/// callers that show sync state should not treat `false` as proof that the
/// latest edit reached the server.
pub struct SyncManager<C, S, T>
where
    C: ChangeSource + 'static,
    S: ScalarStore + 'static,
    T: CollabTransport,
{
    shared: Arc<Shared<C, S, T>>,
    events: mpsc::UnboundedSender<Event>,
    subscription: Mutex<Option<Subscription>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl<C, S, T> SyncManager<C, S, T>
where
    C: ChangeSource + 'static,
    S: ScalarStore + 'static,
    T: CollabTransport,
{
    /// Load persisted state for `context` and start listening to `source`.
    ///
    /// Never contacts the endpoint; call [`SyncManager::initialize`] to resume
    /// a sync left unfinished by an earlier session.
    pub fn new(
        source: C,
        context: SyncContext,
        store: S,
        transport: T,
        config: SyncConfig,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let state = StateStore::new(store, &context);
        let persisted = state.load()?;

        tracing::debug!(
            object_id = %context.object_id(),
            version_vector = persisted.version_vector,
            unsynced = persisted.has_unsynced_changes,
            "Loaded sync state"
        );

        let (status, _) = watch::channel(SyncStatus::from_persisted(persisted));
        let shared = Arc::new(Shared {
            context,
            source,
            transport,
            state,
            persist: Mutex::new(()),
            status,
        });

        let (events, rx) = mpsc::unbounded_channel();
        let subscription = shared
            .source
            .subscribe(mutation_listener(events.clone(), shared.context.object_id()));

        let driver = runtime.spawn(drive(
            Arc::clone(&shared),
            rx,
            Debouncer::new(config.quiet_period),
        ));

        Ok(Self {
            shared,
            events,
            subscription: Mutex::new(Some(subscription)),
            driver: Mutex::new(Some(driver)),
        })
    }

    /// Resume an unfinished sync: if the unsynced flag is set, schedule a
    /// send through the debounce timer. Does nothing otherwise.
    ///
    /// Returns [`Error::Closed`] once [`SyncManager::close`] has been called.
    pub fn initialize(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        if !self.has_unsynced_changes() {
            return Ok(());
        }

        tracing::info!(
            object_id = %self.shared.context.object_id(),
            "Unsynced changes found, scheduling update"
        );
        self.events.send(Event::Schedule).map_err(|_| Error::Closed)
    }

    /// Whether local state may not be reflected on the server.
    pub fn has_unsynced_changes(&self) -> bool {
        self.shared.status.borrow().has_unsynced_changes
    }

    /// Epoch millis of the last response received, or an empty string.
    pub fn last_synced_at(&self) -> String {
        self.shared.status.borrow().last_synced_at.clone()
    }

    /// Current send-attempt counter.
    pub fn version_vector(&self) -> u64 {
        self.shared.status.borrow().version_vector
    }

    pub fn phase(&self) -> SyncPhase {
        self.shared.status.borrow().phase()
    }

    pub fn status(&self) -> SyncStatus {
        self.shared.status.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    pub fn context(&self) -> &SyncContext {
        &self.shared.context
    }

    /// End the session: stop listening to the document and stop the timer.
    ///
    /// A pending debounce is discarded; a send already in flight completes.
    pub fn close(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
        if let Some(driver) = self.driver.lock().take() {
            driver.abort();
        }
        self.shared.set_pending(false);
    }

    pub fn is_closed(&self) -> bool {
        self.driver.lock().is_none()
    }
}

impl<C, S, T> Drop for SyncManager<C, S, T>
where
    C: ChangeSource + 'static,
    S: ScalarStore + 'static,
    T: CollabTransport,
{
    fn drop(&mut self) {
        self.close();
    }
}

fn mutation_listener(events: mpsc::UnboundedSender<Event>, object_id: &str) -> MutationHandler {
    let object_id = object_id.to_string();
    Arc::new(move |_update: &[u8], origin: Origin| {
        // Echoes of the server's own updates must not be sent back.
        if origin == Origin::Remote {
            return;
        }
        tracing::trace!(%object_id, "Local change detected");
        let _ = events.send(Event::Schedule);
    })
}
