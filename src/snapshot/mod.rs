//! Snapshot persistence for queue and history.
//!
//! A snapshot is a pure projection of the manager's jobs, one
//! `(source URI, destination URI, created_at)` triple per entry. It is
//! written after every mutating manager operation and read once at
//! construction, where entries are re-resolved into live transfers.

mod store;

pub use store::JsonSnapshotStore;

use serde::{Deserialize, Serialize};
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

/// One persisted queue or history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub source: String,
    pub destination: String,
    pub created_at: i64,
}

/// Persisted projection of the manager state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub queue: Vec<SnapshotEntry>,
    pub history: Vec<SnapshotEntry>,
}

/// Store seam between the manager and the on-disk encoding.
///
/// `save` is called synchronously after every queue/history mutation, while
/// the manager's state lock is held, so the written snapshot is never torn.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> io::Result<Snapshot>;
    fn save(&self, snapshot: &Snapshot) -> io::Result<()>;
}

/// Current time as Unix seconds (job creation timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
