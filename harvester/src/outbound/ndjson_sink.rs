//! Newline-delimited JSON sink.
//!
//! Records are buffered and written as one compact JSON object per line once
//! `batch_size` records are pending, and again on close. [`NdjsonFileSink`]
//! opens its file through `cap_std` so the sink only touches its own directory.

use std::io::{self, Write};
use std::path::Path;

use cap_std::ambient_authority;
use cap_std::fs::{Dir, File};

use crate::domain::Record;
use crate::domain::ports::{RecordSink, RecordSinkError};

/// Byte destination for [`NdjsonSink`].
pub trait SinkWriter: Write + Send + Sync {
    /// Make written bytes durable. Defaults to [`Write::flush`].
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl SinkWriter for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl SinkWriter for Vec<u8> {}

/// Buffered NDJSON writer over any [`SinkWriter`].
#[derive(Debug)]
pub struct NdjsonSink<W> {
    writer: W,
    buffer: Vec<u8>,
    pending: usize,
    batch_size: usize,
    written: u64,
}

/// NDJSON sink writing to a file.
pub type NdjsonFileSink = NdjsonSink<File>;

impl NdjsonSink<File> {
    /// Create (or truncate) `path` and buffer up to `batch_size` records
    /// between writes. A batch size of zero writes every record immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RecordSinkError::Write`] when the parent directory cannot be
    /// opened or the file cannot be created.
    pub fn create(path: &Path, batch_size: usize) -> Result<Self, RecordSinkError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            RecordSinkError::write(format!("{} has no file name", path.display()))
        })?;
        let directory = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|error| write_error(parent, &error))?;
        let file = directory
            .create(file_name)
            .map_err(|error| write_error(path, &error))?;
        Ok(Self::from_writer(file, batch_size))
    }
}

impl<W: SinkWriter> NdjsonSink<W> {
    /// Wrap an already-open writer.
    pub fn from_writer(writer: W, batch_size: usize) -> Self {
        Self {
            writer,
            buffer: Vec::new(),
            pending: 0,
            batch_size: batch_size.max(1),
            written: 0,
        }
    }

    /// Records written so far, excluding the pending buffer.
    pub fn written(&self) -> u64 {
        self.written
    }
}

fn write_error(path: &Path, error: &io::Error) -> RecordSinkError {
    RecordSinkError::write(format!("{}: {error}", path.display()))
}

impl<W: SinkWriter> RecordSink for NdjsonSink<W> {
    fn accept(&mut self, record: &Record) -> Result<(), RecordSinkError> {
        serde_json::to_writer(&mut self.buffer, record)
            .map_err(|error| RecordSinkError::encode(error.to_string()))?;
        self.buffer.push(b'\n');
        self.pending += 1;
        if self.pending >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// A failed write drops the batch: part of it may already be on disk, so
    /// writing it again would duplicate lines.
    fn flush(&mut self) -> Result<(), RecordSinkError> {
        if self.pending == 0 {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.buffer);
        let records = std::mem::take(&mut self.pending);
        self.writer
            .write_all(&batch)
            .and_then(|()| self.writer.flush())
            .map_err(|error| {
                RecordSinkError::write(format!("{error}; dropped a batch of {records} records"))
            })?;
        self.written = self.written.saturating_add(records as u64);
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecordSinkError> {
        self.flush()?;
        self.writer
            .sync()
            .map_err(|error| RecordSinkError::write(error.to_string()))
    }
}
