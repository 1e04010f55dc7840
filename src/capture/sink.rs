//! Capture sink shared by all relay workers.
//!
//! Records from every worker interleave into one JSON-lines stream under a
//! single lock; output order is lock acquisition order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::info;

use crate::capture::record::CaptureRecord;
use crate::error::{constants, RelayError, Result};

type Writer = Box<dyn Write + Send>;

pub struct CaptureSink {
    writer: Mutex<Option<Writer>>,
}

impl std::fmt::Debug for CaptureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSink").finish_non_exhaustive()
    }
}

impl CaptureSink {
    /// Create (truncating) a capture file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Recording datagrams");
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    pub fn new(writer: Writer) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Append one record as a JSON line and flush it.
    pub fn record(&self, record: &CaptureRecord) -> Result<()> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| RelayError::CaptureUnavailable(constants::ERR_CAPTURE_POISONED))?;
        let writer = guard
            .as_mut()
            .ok_or(RelayError::CaptureUnavailable(constants::ERR_CAPTURE_CLOSED))?;
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Flush and drop the writer; later records fail with `CaptureUnavailable`.
    pub fn close(&self) -> Result<()> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| RelayError::CaptureUnavailable(constants::ERR_CAPTURE_POISONED))?;
        if let Some(mut writer) = guard.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
