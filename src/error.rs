//! Failure taxonomy for the transfer core.
//!
//! Failures inside a running copy loop are absorbed into job state and
//! reported through listener callbacks; only resolution and explicit
//! unsupported-operation failures propagate to the direct caller.

use std::io;
use thiserror::Error;

/// Errors surfaced by the transfer core.
#[derive(Debug, Error)]
pub enum Error {
    /// A location string could not be resolved, or an intermediate
    /// destination path could not be created.
    #[error("failed to resolve location `{location}`: {source}")]
    Resolution {
        location: String,
        #[source]
        source: io::Error,
    },

    /// I/O failure inside the copy loop. Converted to `Stopped` status plus
    /// an error event at the job boundary, never raised to the scheduler.
    #[error("transfer failed: {0}")]
    Transfer(#[from] io::Error),

    /// Snapshot load/save failure. Load failures degrade to an empty queue;
    /// save failures leave the prior on-disk snapshot stale.
    #[error("snapshot persistence failed: {0}")]
    Persistence(#[source] io::Error),

    /// Future-dated starts are not available.
    #[error("scheduled (future-dated) starts are not implemented")]
    ScheduleUnsupported,
}

impl Error {
    pub(crate) fn resolution(location: impl Into<String>, source: io::Error) -> Self {
        Error::Resolution {
            location: location.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
