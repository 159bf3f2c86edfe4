//! Load-time reconstruction of queue and history from the snapshot.
//!
//! Best effort: an entry whose source or destination no longer resolves is
//! logged and dropped, the rest of the batch loads normally. A snapshot
//! that cannot be read at all degrades to an empty queue and history.

use std::sync::Arc;

use crate::error::Error;
use crate::snapshot::SnapshotEntry;
use crate::transfer::{Transfer, TransferStatus};

use super::ManagerInner;

impl ManagerInner {
    pub(super) fn load_snapshot(self: &Arc<Self>) {
        let snapshot = match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!("failed to load snapshot, starting empty: {}", err);
                return;
            }
        };

        let mut state = self.state.lock().unwrap();
        tracing::debug!("loading transfer history");
        for entry in &snapshot.history {
            match self.revive(entry) {
                Ok(transfer) => {
                    transfer.set_status(TransferStatus::Complete);
                    state.history.insert(transfer);
                }
                Err(err) => tracing::error!("dropping history entry: {}", err),
            }
        }
        tracing::debug!("loading transfer queue");
        for entry in &snapshot.queue {
            match self.revive(entry) {
                Ok(transfer) => {
                    state.queue.insert(transfer);
                }
                Err(err) => tracing::error!("dropping queue entry: {}", err),
            }
        }
        tracing::info!(
            "snapshot loaded: {} queued, {} finished",
            state.queue.len(),
            state.history.len()
        );
    }

    fn revive(self: &Arc<Self>, entry: &SnapshotEntry) -> Result<Arc<Transfer>, Error> {
        let source = self.access.resolve(&entry.source)?;
        let destination = self.access.resolve(&entry.destination)?;
        let transfer = Transfer::with_created_at(source, destination, entry.created_at);
        transfer.set_owner(Arc::downgrade(self));
        Ok(transfer)
    }
}
