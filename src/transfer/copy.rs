//! The resumable copy loop.

use std::io::{Read, Write};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::Result;
use crate::transfer::{Transfer, TransferStatus};

/// Fixed read/write unit. Progress accounting and the pause poll happen
/// once per chunk.
const CHUNK_SIZE: usize = 8 * 1024;

impl Transfer {
    /// Copy the source to the destination starting at the destination's
    /// current size, flushing every chunk so written bytes are durable
    /// before the next read.
    ///
    /// Both streams are released on every exit path: normal end-of-stream,
    /// cooperative stop, and error returns all drop them on scope exit.
    pub(super) fn copy(self: &Arc<Self>) -> Result<()> {
        let total = self.source.size()?;
        self.total_size.store(total, Ordering::SeqCst);

        let resume_offset = if self.destination.exists()? {
            self.destination.size()?
        } else {
            0
        };
        if resume_offset > 0 {
            tracing::debug!(
                "resuming {} at byte {}",
                self.destination.uri(),
                resume_offset
            );
        }
        // The resumed prefix counts as transferred from the start; events
        // only fire once the percent actually moves.
        self.transferred.store(resume_offset, Ordering::SeqCst);

        let mut reader = self.source.open_read_at(resume_offset)?;
        let mut writer = self.destination.open_append()?;

        if total == 0 {
            // Nothing to read; the destination already holds everything the
            // source has.
            self.update_progress(resume_offset, total);
            return Ok(());
        }

        let mut written: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                // A zero-length read is not proof of end-of-stream for
                // every provider; probe a single byte to tell the
                // difference.
                let mut probe = [0u8; 1];
                if reader.read(&mut probe)? == 0 {
                    break;
                }
                writer.write_all(&probe)?;
                writer.flush()?;
                written += 1;
            } else {
                writer.write_all(&buf[..n])?;
                writer.flush()?;
                written += n as u64;
            }

            self.update_progress(resume_offset + written, total);

            if self.status() == TransferStatus::Stopped {
                break;
            }
        }

        Ok(())
    }
}
