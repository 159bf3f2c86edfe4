//! Listener contracts for transfer lifecycle events.
//!
//! Delivery is a two-tier ordered pipeline: a job notifies its local
//! `TransferListener`s first (registration order), then its owning manager,
//! which fans out to the `ManagerListener`s. Callbacks run synchronously on
//! the worker executing the transfer, so a slow listener stalls the copy
//! loop and, through it, the serial queue.

use std::sync::Arc;

use crate::error::Error;
use crate::transfer::Transfer;

/// Job-local lifecycle observer. All methods default to no-ops so an
/// implementor only overrides the events it cares about.
pub trait TransferListener: Send + Sync {
    /// The transfer entered execution.
    fn started(&self) {}

    /// The transfer stopped cooperatively before completing.
    fn paused(&self) {}

    /// The transfer ran to the end of the source.
    fn finished(&self) {}

    /// The integer percent changed.
    fn progress(&self) {}

    /// The copy loop failed; the transfer is now stopped.
    fn error(&self, _error: &Error) {}
}

/// Manager-level observer, notified after the job-local tier.
pub trait ManagerListener: Send + Sync {
    fn started(&self, _transfer: &Arc<Transfer>) {}

    fn paused(&self, _transfer: &Arc<Transfer>) {}

    fn finished(&self, _transfer: &Arc<Transfer>) {}

    fn progress(&self, _transfer: &Arc<Transfer>) {}

    fn error(&self, _transfer: &Arc<Transfer>, _error: &Error) {}
}
