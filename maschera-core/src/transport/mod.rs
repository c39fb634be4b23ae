//! Capability traits over the input and output event logs.
//!
//! The masking engine only ever talks to a `RecordSource` and a `RecordSink`,
//! so it runs unchanged against a real log client, a byte stream, or the
//! in-memory fakes used in tests.

use async_trait::async_trait;

use crate::errors::{MascheraError, SourceError, WriteError};
use crate::record::Record;

pub mod lines;
pub mod memory;

pub use lines::{open_sink, open_source, LineSink, LineSource, STDIO_ENDPOINT};
pub use memory::{MemorySink, MemorySource};

#[async_trait]
pub trait RecordSource: Send {
    /// Waits for the next record.
    ///
    /// `Ok(None)` is a clean end-of-stream: no further records will ever be
    /// produced. Any `Err` is transient and the caller may simply read again.
    /// Offsets are committed by the implementation, not by the caller.
    async fn next(&mut self) -> Result<Option<Record>, SourceError>;

    /// Releases the underlying transport.
    async fn close(&mut self) -> Result<(), MascheraError>;
}

#[async_trait]
pub trait RecordSink: Send {
    /// Durably appends the records, in order.
    async fn write(&mut self, records: &[Record]) -> Result<(), WriteError>;

    /// Flushes and releases the underlying transport.
    async fn close(&mut self) -> Result<(), MascheraError>;
}
