//! One transfer unit: status machine, progress counters, resumable copy.
//!
//! A `Transfer` owns its source/destination handles for life. Its copy loop
//! is blocking; the owning manager runs it on the single scheduler worker,
//! while a standalone transfer spawns its own one-off blocking task, so the
//! two kinds never share an execution context.

mod copy;

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::Error;
use crate::events::TransferListener;
use crate::manager::ManagerInner;
use crate::snapshot::unix_timestamp;
use crate::vfs::FileHandle;

/// Lifecycle states. `Complete` is terminal; `Stopped` can be rescheduled
/// and resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Scheduled,
    InProgress,
    Stopped,
    Complete,
}

/// Status stored as an atomic so the copy loop, the scheduler, and callers
/// on other threads all see one coherent value without a lock.
struct AtomicStatus(AtomicU8);

impl AtomicStatus {
    fn new(status: TransferStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    fn load(&self) -> TransferStatus {
        match self.0.load(Ordering::SeqCst) {
            0 => TransferStatus::Scheduled,
            1 => TransferStatus::InProgress,
            2 => TransferStatus::Stopped,
            _ => TransferStatus::Complete,
        }
    }

    fn store(&self, status: TransferStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }
}

/// Point-in-time progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes present at the destination, including any resumed prefix.
    pub transferred: u64,
    /// Total source size; 0 until the transfer has started.
    pub total: u64,
}

impl Progress {
    /// Integer percent in 0..=100. An empty source counts as complete.
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        (self.transferred * 100 / self.total).min(100)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.transferred as f64 / self.total as f64).min(1.0)
    }
}

/// One source-to-destination transfer unit.
///
/// Identity is the `(source URI, destination URI)` pair: two transfers with
/// the same pair compare equal no matter when they were created. Ordering
/// for queue selection uses `created_at`.
pub struct Transfer {
    source: Arc<dyn FileHandle>,
    destination: Arc<dyn FileHandle>,
    created_at: i64,
    status: AtomicStatus,
    total_size: AtomicU64,
    transferred: AtomicU64,
    /// Last emitted percent, kept to suppress duplicate progress events.
    percent: AtomicU64,
    listeners: Mutex<Vec<Arc<dyn TransferListener>>>,
    owner: Mutex<Weak<ManagerInner>>,
}

impl Transfer {
    /// New transfer in `Scheduled` state, stamped with the current time.
    pub fn new(source: Arc<dyn FileHandle>, destination: Arc<dyn FileHandle>) -> Arc<Self> {
        Self::with_created_at(source, destination, unix_timestamp())
    }

    /// Reconstructed transfer carrying its original creation time
    /// (snapshot load path).
    pub(crate) fn with_created_at(
        source: Arc<dyn FileHandle>,
        destination: Arc<dyn FileHandle>,
        created_at: i64,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            destination,
            created_at,
            status: AtomicStatus::new(TransferStatus::Scheduled),
            total_size: AtomicU64::new(0),
            transferred: AtomicU64::new(0),
            percent: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
            owner: Mutex::new(Weak::new()),
        })
    }

    pub fn source(&self) -> &Arc<dyn FileHandle> {
        &self.source
    }

    pub fn destination(&self) -> &Arc<dyn FileHandle> {
        &self.destination
    }

    /// Base name of the source.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Creation time as Unix seconds.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn status(&self) -> TransferStatus {
        self.status.load()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            transferred: self.transferred.load(Ordering::SeqCst),
            total: self.total_size.load(Ordering::SeqCst),
        }
    }

    /// Last emitted integer percent (0 before the first progress event).
    pub fn percent(&self) -> u64 {
        self.percent.load(Ordering::SeqCst)
    }

    pub fn add_listener(&self, listener: Arc<dyn TransferListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn TransferListener>) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Mark as `Scheduled`. No side effects beyond the flag; a stopped
    /// transfer must be rescheduled before it can run again.
    pub fn schedule(&self) {
        self.status.store(TransferStatus::Scheduled);
    }

    /// Request a cooperative stop. The copy loop polls the flag once per
    /// chunk, so a stalled blocking read delays the effect until it
    /// returns.
    pub fn pause(&self) {
        self.status.store(TransferStatus::Stopped);
    }

    /// Mark as `InProgress`. A transfer without an owning manager spawns
    /// its own dedicated blocking worker; manager-owned transfers are
    /// executed by the manager's serial worker instead.
    ///
    /// Standalone use must happen inside a Tokio runtime.
    pub fn start(self: &Arc<Self>) {
        self.status.store(TransferStatus::InProgress);
        if self.owner().is_none() {
            let job = Arc::clone(self);
            tokio::task::spawn_blocking(move || job.run());
        }
    }

    pub(crate) fn set_owner(&self, owner: Weak<ManagerInner>) {
        *self.owner.lock().unwrap() = owner;
    }

    pub(crate) fn set_status(&self, status: TransferStatus) {
        self.status.store(status);
    }

    fn owner(&self) -> Option<Arc<ManagerInner>> {
        self.owner.lock().unwrap().upgrade()
    }

    /// Snapshot of the listener list; callbacks run outside the lock so a
    /// listener may add or remove listeners without deadlocking.
    fn listeners(&self) -> Vec<Arc<dyn TransferListener>> {
        self.listeners.lock().unwrap().clone()
    }

    /// Execute the transfer to a final disposition. Never panics or returns
    /// an error: copy failures are logged, force `Stopped`, and surface as
    /// error events.
    pub(crate) fn run(self: &Arc<Self>) {
        tracing::trace!(destination = self.destination.uri(), "transfer start");
        for listener in self.listeners() {
            listener.started();
        }
        if let Some(owner) = self.owner() {
            owner.on_started(self);
        }

        if let Err(err) = self.copy() {
            tracing::error!("transfer of {} failed: {}", self.source.uri(), err);
            self.status.store(TransferStatus::Stopped);
            for listener in self.listeners() {
                listener.error(&err);
            }
            if let Some(owner) = self.owner() {
                owner.on_error(self, &err);
            }
        }

        let status = self.status.load();
        if status != TransferStatus::Stopped && status != TransferStatus::Scheduled {
            self.status.store(TransferStatus::Complete);
            tracing::trace!(destination = self.destination.uri(), "transfer finished");
            for listener in self.listeners() {
                listener.finished();
            }
            if let Some(owner) = self.owner() {
                owner.on_finished(self);
            }
        } else {
            tracing::trace!(destination = self.destination.uri(), "transfer paused");
            for listener in self.listeners() {
                listener.paused();
            }
            if let Some(owner) = self.owner() {
                owner.on_paused(self);
            }
        }
    }

    /// Record the current counters and emit a progress event when the
    /// integer percent moved.
    fn update_progress(self: &Arc<Self>, transferred: u64, total: u64) {
        self.transferred.store(transferred, Ordering::SeqCst);
        let new_percent = Progress { transferred, total }.percent();
        if self.percent.swap(new_percent, Ordering::SeqCst) != new_percent {
            for listener in self.listeners() {
                listener.progress();
            }
            if let Some(owner) = self.owner() {
                owner.on_progress(self);
            }
        }
    }
}

impl PartialEq for Transfer {
    fn eq(&self, other: &Self) -> bool {
        self.source.uri() == other.source.uri()
            && self.destination.uri() == other.destination.uri()
    }
}

impl Eq for Transfer {}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let progress = self.progress();
        f.debug_struct("Transfer")
            .field("name", &self.name())
            .field("destination", &self.destination.uri())
            .field("created_at", &self.created_at)
            .field("status", &self.status.load())
            .field("total", &progress.total)
            .field("transferred", &progress.transferred)
            .field("percent", &self.percent())
            .finish()
    }
}
