//! Serial transfer scheduler: queue, dedup, dispatch, persistence, events.
//!
//! The manager owns the pending queue and the completed history, both
//! unique by `(source, destination)` and with a pair in at most one of the
//! two. Execution is serialized through a single worker task; completion
//! moves the job to history, persists, notifies listeners, and promotes the
//! next scheduled job, which keeps the queue autonomous.
//!
//! Queue, history, and snapshot writes are mutated from caller threads
//! (`add`, `remove`) and from the worker (completion); every such mutation
//! goes through one state lock, and the snapshot is saved while it is held
//! so a torn snapshot can never reach disk.

mod expand;
mod load;
mod queue;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::config::{self, FerryConfig};
use crate::error::{Error, Result};
use crate::events::ManagerListener;
use crate::snapshot::{JsonSnapshotStore, Snapshot, SnapshotEntry, SnapshotStore};
use crate::transfer::{Transfer, TransferStatus};
use crate::vfs::{FileAccess, FileHandle};

use queue::JobSet;

/// How a newly added transfer is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartType {
    /// Schedule, and start right away when nothing else is running.
    #[default]
    Automatically,
    /// Schedule only; the caller starts it later.
    Manually,
    /// Start at a future date. Not available; adding with this fails fast.
    Schedule,
}

#[derive(Default)]
struct State {
    queue: JobSet,
    history: JobSet,
}

pub(crate) struct ManagerInner {
    state: Mutex<State>,
    store: Box<dyn SnapshotStore>,
    access: Arc<FileAccess>,
    listeners: Mutex<Vec<Arc<dyn ManagerListener>>>,
    worker_tx: mpsc::UnboundedSender<Arc<Transfer>>,
}

/// The serial scheduler. Cheap to clone handles out of via the returned
/// `Arc<Transfer>`s; the manager itself is usually owned in one place.
///
/// Construction spawns the worker task, so a manager must be created inside
/// a Tokio runtime.
pub struct TransferManager {
    inner: Arc<ManagerInner>,
}

impl TransferManager {
    /// Manager with the default XDG snapshot path and local file access.
    pub fn open_default() -> Result<Self> {
        Self::open_at(config::default_data_file()?)
    }

    /// Manager persisting at an explicit snapshot path. Intended for tests
    /// and embedders that manage their own state directory.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_parts(
            Box::new(JsonSnapshotStore::new(path)),
            Arc::new(FileAccess::new()),
        )
    }

    /// Manager configured from `FerryConfig`: snapshot path override plus
    /// the `ftp://` options table entry.
    pub fn from_config(cfg: &FerryConfig) -> Result<Self> {
        let path = match &cfg.data_file {
            Some(path) => path.clone(),
            None => config::default_data_file()?,
        };
        Self::with_parts(
            Box::new(JsonSnapshotStore::new(path)),
            Arc::new(FileAccess::with_ftp_options(cfg.ftp.clone())),
        )
    }

    /// Full injection of the snapshot store and the provider registry.
    pub fn with_parts(store: Box<dyn SnapshotStore>, access: Arc<FileAccess>) -> Result<Self> {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ManagerInner {
            state: Mutex::new(State::default()),
            store,
            access,
            listeners: Mutex::new(Vec::new()),
            worker_tx,
        });
        spawn_worker(worker_rx);
        inner.load_snapshot();
        Ok(Self { inner })
    }

    /// Resolve, expand, dedup, enqueue, and dispatch automatically.
    /// Returns the accepted jobs; duplicates are logged and omitted.
    pub fn add(&self, source: &str, destination: &str) -> Result<Vec<Arc<Transfer>>> {
        self.add_with(source, destination, StartType::Automatically)
    }

    /// `add` with an explicit start type. `StartType::Schedule` fails
    /// before anything is resolved or queued.
    pub fn add_with(
        &self,
        source: &str,
        destination: &str,
        start_type: StartType,
    ) -> Result<Vec<Arc<Transfer>>> {
        if start_type == StartType::Schedule {
            return Err(Error::ScheduleUnsupported);
        }
        tracing::debug!("adding transfer {} -> {}", source, destination);
        let source = self.inner.access.resolve(source)?;
        let destination = self.inner.access.resolve(destination)?;

        let mut added = Vec::new();
        for (leaf_source, leaf_destination) in
            expand::expand(&self.inner.access, &source, &destination)?
        {
            if let Some(transfer) =
                self.inner
                    .add_one(leaf_source, leaf_destination, start_type)
            {
                added.push(transfer);
            }
        }
        Ok(added)
    }

    /// Add one pre-resolved pair directly, without expansion.
    pub fn add_handles(
        &self,
        source: Arc<dyn FileHandle>,
        destination: Arc<dyn FileHandle>,
        start_type: StartType,
    ) -> Result<Option<Arc<Transfer>>> {
        if start_type == StartType::Schedule {
            return Err(Error::ScheduleUnsupported);
        }
        Ok(self.inner.add_one(source, destination, start_type))
    }

    /// (Re)schedule a transfer and start it when nothing else is running.
    /// A stopped transfer resumes from the destination's current size.
    pub fn start(&self, transfer: &Arc<Transfer>) {
        self.inner.start_transfer(transfer);
    }

    /// Promote and dispatch the earliest-created scheduled transfer; no-op
    /// when the queue is empty, something is running, or none is scheduled.
    pub fn start_next(&self) {
        self.inner.start_next();
    }

    /// Schedule every queued transfer; the first starts immediately and
    /// completion advances through the rest.
    pub fn start_all(&self) {
        for transfer in self.queue() {
            self.inner.start_transfer(&transfer);
        }
    }

    /// Request a cooperative stop of one transfer.
    pub fn pause(&self, transfer: &Arc<Transfer>) {
        transfer.pause();
        tracing::trace!("pause requested: {:?}", transfer);
    }

    /// Request a cooperative stop of every in-progress transfer.
    pub fn pause_all(&self) {
        for transfer in self.queue() {
            if transfer.status() == TransferStatus::InProgress {
                self.pause(&transfer);
            }
        }
    }

    /// Remove a transfer from the queue and persist. Does not stop a
    /// running copy loop; pause first when that matters.
    pub fn remove(&self, transfer: &Arc<Transfer>) {
        let mut state = self.inner.state.lock().unwrap();
        state.queue.remove(transfer);
        self.inner.save_locked(&state);
    }

    /// True iff any queued transfer is currently in progress.
    pub fn is_active(&self) -> bool {
        self.inner
            .state
            .lock()
            .unwrap()
            .queue
            .iter()
            .any(|t| t.status() == TransferStatus::InProgress)
    }

    /// Jobs not yet moved to history, in insertion order.
    pub fn queue(&self) -> Vec<Arc<Transfer>> {
        self.inner.state.lock().unwrap().queue.to_vec()
    }

    /// Finished jobs, in completion order.
    pub fn history(&self) -> Vec<Arc<Transfer>> {
        self.inner.state.lock().unwrap().history.to_vec()
    }

    pub fn add_listener(&self, listener: Arc<dyn ManagerListener>) {
        self.inner.listeners.lock().unwrap().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ManagerListener>) {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// The provider registry this manager resolves locations through.
    pub fn file_access(&self) -> &Arc<FileAccess> {
        &self.inner.access
    }
}

/// Single worker: receives dispatched jobs and runs each blocking copy loop
/// to completion before taking the next, which is what serializes
/// manager-driven transfers.
fn spawn_worker(mut worker_rx: mpsc::UnboundedReceiver<Arc<Transfer>>) {
    tokio::spawn(async move {
        while let Some(job) = worker_rx.recv().await {
            let result = tokio::task::spawn_blocking(move || job.run()).await;
            if let Err(err) = result {
                tracing::error!("transfer worker task failed: {}", err);
            }
        }
    });
}

impl ManagerInner {
    /// Dedup against queue and history, insert, persist, and dispatch per
    /// start type. A duplicate is logged and dropped, not an error.
    fn add_one(
        self: &Arc<Self>,
        source: Arc<dyn FileHandle>,
        destination: Arc<dyn FileHandle>,
        start_type: StartType,
    ) -> Option<Arc<Transfer>> {
        let transfer = Transfer::new(source, destination);
        let dispatch = {
            let mut state = self.state.lock().unwrap();
            if state.queue.contains(&transfer) || state.history.contains(&transfer) {
                tracing::info!("{} already transferred and/or queued", transfer.name());
                return None;
            }
            transfer.set_owner(Arc::downgrade(self));
            state.queue.insert(Arc::clone(&transfer));
            self.save_locked(&state);
            tracing::info!("queued: {:?}", transfer);

            transfer.schedule();
            start_type == StartType::Automatically && self.promote_if_idle(&transfer, &state)
        };
        if dispatch {
            self.dispatch(&transfer);
        }
        Some(transfer)
    }

    /// `start(transfer)`: adopt, schedule, and promote when idle. A
    /// transfer that is already running, or that has completed, is left
    /// alone so the single-`InProgress` invariant and the terminal
    /// `Complete` state both hold.
    fn start_transfer(self: &Arc<Self>, transfer: &Arc<Transfer>) {
        match transfer.status() {
            TransferStatus::InProgress | TransferStatus::Complete => return,
            TransferStatus::Scheduled | TransferStatus::Stopped => {}
        }
        transfer.set_owner(Arc::downgrade(self));
        transfer.schedule();
        let dispatch = {
            let state = self.state.lock().unwrap();
            self.promote_if_idle(transfer, &state)
        };
        if dispatch {
            self.dispatch(transfer);
        }
    }

    fn start_next(&self) {
        let next = {
            let state = self.state.lock().unwrap();
            let next = state
                .queue
                .iter()
                .filter(|t| t.status() == TransferStatus::Scheduled)
                .min_by_key(|t| t.created_at())
                .cloned();
            match next {
                Some(transfer) if self.promote_if_idle(&transfer, &state) => Some(transfer),
                _ => None,
            }
        };
        if let Some(transfer) = next {
            self.dispatch(&transfer);
        }
    }

    /// Promote to `InProgress` unless another queued transfer already is.
    /// Must run under the state lock so two callers never both promote.
    fn promote_if_idle(&self, transfer: &Arc<Transfer>, state: &State) -> bool {
        if state
            .queue
            .iter()
            .any(|t| t.status() == TransferStatus::InProgress)
        {
            return false;
        }
        transfer.start();
        true
    }

    fn dispatch(&self, transfer: &Arc<Transfer>) {
        tracing::debug!("dispatching {:?} to worker", transfer);
        if self.worker_tx.send(Arc::clone(transfer)).is_err() {
            tracing::error!("transfer worker is gone, cannot dispatch");
        }
    }

    /// Serialize queue and history to the store. Called with the state lock
    /// held; a failed save is logged and leaves the prior snapshot stale.
    fn save_locked(&self, state: &State) {
        let snapshot = Snapshot {
            queue: state.queue.iter().map(entry_of).collect(),
            history: state.history.iter().map(entry_of).collect(),
        };
        if let Err(err) = self.store.save(&snapshot) {
            tracing::error!("failed to save snapshot, on-disk state is stale: {}", err);
        }
    }

    fn notify(&self, f: impl Fn(&dyn ManagerListener)) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            f(listener.as_ref());
        }
    }

    pub(crate) fn on_started(&self, transfer: &Arc<Transfer>) {
        tracing::info!("started: {}", transfer.name());
        self.notify(|l| l.started(transfer));
    }

    pub(crate) fn on_paused(&self, transfer: &Arc<Transfer>) {
        tracing::info!("paused: {}", transfer.name());
        self.notify(|l| l.paused(transfer));
    }

    pub(crate) fn on_progress(&self, transfer: &Arc<Transfer>) {
        tracing::debug!("progress: {} at {}%", transfer.name(), transfer.percent());
        self.notify(|l| l.progress(transfer));
    }

    pub(crate) fn on_error(&self, transfer: &Arc<Transfer>, error: &Error) {
        tracing::warn!("error: {}: {}", transfer.name(), error);
        self.notify(|l| l.error(transfer, error));
    }

    /// Completion: queue to history, persist, notify, advance. The advance
    /// is what keeps the queue serial and self-driving.
    pub(crate) fn on_finished(&self, transfer: &Arc<Transfer>) {
        tracing::info!("finished: {}", transfer.name());
        {
            let mut state = self.state.lock().unwrap();
            state.queue.remove(transfer);
            state.history.insert(Arc::clone(transfer));
            self.save_locked(&state);
        }
        self.notify(|l| l.finished(transfer));
        self.start_next();
    }
}

fn entry_of(transfer: &Arc<Transfer>) -> SnapshotEntry {
    SnapshotEntry {
        source: transfer.source().uri().to_string(),
        destination: transfer.destination().uri().to_string(),
        created_at: transfer.created_at(),
    }
}
