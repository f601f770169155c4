//! Driven port for consumers of accepted records.

use super::define_port_error;
use crate::domain::Record;

define_port_error! {
    /// Errors raised by record sinks.
    pub enum RecordSinkError {
        /// Writing to the underlying store failed.
        Write { message: String } => "record sink write failed: {message}",
        /// A record could not be encoded for output.
        Encode { message: String } => "record sink encoding failed: {message}",
    }
}

/// Consumer of accepted records.
///
/// Sinks may buffer. They must flush at least once per batch threshold and
/// must not lose buffered records when [`RecordSink::close`] is called.
#[cfg_attr(test, mockall::automock)]
pub trait RecordSink: Send + Sync {
    /// Receive one accepted record, in acceptance order.
    fn accept(&mut self, record: &Record) -> Result<(), RecordSinkError>;

    /// Push buffered records to durable storage.
    fn flush(&mut self) -> Result<(), RecordSinkError>;

    /// Final flush after the fetch loop stops.
    fn close(&mut self) -> Result<(), RecordSinkError> {
        self.flush()
    }
}
