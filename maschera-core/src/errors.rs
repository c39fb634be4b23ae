//! errors.rs - Custom error types for the maschera-core library.
//!
//! This module defines a structured error enum for the library, providing
//! specific, actionable error types that can be handled programmatically.
//! Write failures get their own closed enum so the masking loop can branch
//! on the kind of failure instead of inspecting error shapes.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;
use std::io;

use thiserror::Error;

/// This enum represents all possible error types in the `maschera-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MascheraError {
    #[error("Error deserializing record payload as a JSON object: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Error signing record payload: {0}")]
    Signing(String),

    #[error("Error writing record to sink: {0}")]
    Write(#[from] WriteError),

    #[error("Masking loop was cancelled")]
    Cancelled,

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] io::Error),

    #[error("A fatal error occurred: {0}")]
    Fatal(String),
}

/// A failure reported by a record source while reading.
///
/// Every variant is transient from the masking loop's point of view: the
/// read is logged and retried. End-of-stream is not an error and is reported
/// as `Ok(None)` by the source instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SourceError {
    #[error("I/O failure while reading: {0}")]
    Io(#[from] io::Error),

    #[error("record at offset {offset} is {size} bytes, exceeding the {limit} byte limit")]
    RecordTooLarge { offset: i64, size: usize, limit: usize },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// The outcome of a failed sink write.
///
/// This enum is deliberately exhaustive: a write either failed in a way the
/// loop can absorb, or the durability guarantee could not be met and the
/// pipeline must stop.
#[derive(Error, Debug)]
pub enum WriteError {
    /// A transient problem, e.g. some destination partitions are unreachable.
    #[error("recoverable write failure: {0}")]
    Recoverable(String),

    /// Durable acknowledgment could not be obtained from the required replicas.
    #[error("write was not durably acknowledged: {0}")]
    Fatal(String),
}

impl WriteError {
    /// Classifies an I/O error raised while appending to a byte stream.
    ///
    /// Interrupted, would-block and timed-out writes may succeed on the next
    /// attempt. Anything else means the stream can no longer confirm writes.
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                WriteError::Recoverable(err.to_string())
            }
            _ => WriteError::Fatal(err.to_string()),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, WriteError::Fatal(_))
    }
}

/// Every failure collected while releasing the source and the sink, in the
/// order they were encountered.
#[derive(Debug, Default)]
pub struct ShutdownError {
    errors: Vec<MascheraError>,
}

impl ShutdownError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: MascheraError) {
        self.errors.push(err);
    }

    pub fn errors(&self) -> &[MascheraError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Collapses the aggregation: `Ok` when nothing failed, otherwise the
    /// full list of failures.
    pub fn into_result(self) -> Result<(), ShutdownError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.errors.len() {
            1 => write!(f, "1 error occurred during shutdown:")?,
            n => write!(f, "{} errors occurred during shutdown:", n)?,
        }
        for err in &self.errors {
            write!(f, "\n\t* {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ShutdownError {}
