//! Direct passthrough persistence for non-planar captures.

use std::io::Write;

use crate::traits::{CaptureError, DeliverySink, Result};

/// Delivery sink for interleaved RGB captures.
///
/// RGB buffers arrive already in file order, so each one is appended at
/// an advancing offset with no intermediate frame buffer. After one
/// failed write every later delivery is refused without touching the
/// destination; the capture is over at that point and late buffers must
/// not land in the file.
pub struct DirectWriter<W> {
    sink: W,
    written: u64,
    failed: bool,
}

impl<W: Write> DirectWriter<W> {
    /// Wrap a destination writer, with the write offset at zero.
    #[must_use]
    pub const fn new(sink: W) -> Self {
        Self {
            sink,
            written: 0,
            failed: false,
        }
    }

    /// Total bytes persisted so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Unwrap the destination writer.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> DeliverySink for DirectWriter<W> {
    fn deliver(&mut self, buffer: &[u8]) -> Result<()> {
        if self.failed {
            return Err(CaptureError::StorageWriteFailed(std::io::Error::new(
                std::io::ErrorKind::Other,
                "destination already failed, buffer dropped",
            )));
        }
        match self.sink.write_all(buffer) {
            Ok(()) => {
                self.written += buffer.len() as u64;
                Ok(())
            }
            Err(err) => {
                self.failed = true;
                Err(CaptureError::StorageWriteFailed(err))
            }
        }
    }
}
