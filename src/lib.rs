//! ferry: resumable multi-protocol file-transfer manager.
//!
//! Transfer jobs between arbitrary source and destination locations are
//! queued, deduplicated, executed one at a time with byte-offset resume,
//! and persisted as a snapshot that survives process restarts. Observers
//! subscribe to lifecycle events at job or manager granularity.
//!
//! Protocol specifics live behind the `vfs` provider traits; the crate
//! ships a local-filesystem provider, and remote schemes (FTP and friends)
//! register through [`FileAccess`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod manager;
pub mod snapshot;
pub mod transfer;
pub mod vfs;

pub use config::FerryConfig;
pub use error::{Error, Result};
pub use events::{ManagerListener, TransferListener};
pub use manager::{StartType, TransferManager};
pub use snapshot::{JsonSnapshotStore, Snapshot, SnapshotEntry, SnapshotStore};
pub use transfer::{Progress, Transfer, TransferStatus};
pub use vfs::{FileAccess, FileHandle, FileProvider, LocalProvider, SchemeOptions};
