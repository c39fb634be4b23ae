// maschera-core/src/masker.rs
//! The consume/produce loop.
//!
//! `Masker` is the sole reader of the PII source and the sole writer of the
//! masked sink. It processes one record at a time, in source order:
//!
//! 1. check for cancellation, then wait for the next record (the wait itself
//!    is abandoned as soon as cancellation is requested);
//! 2. redact the record; a malformed payload or a signing failure drops the
//!    record and the loop moves on;
//! 3. write the masked payload as a single new record. A recoverable write
//!    failure is logged and absorbed, a fatal one stops the loop and becomes
//!    its result. An in-flight write is never interrupted.
//!
//! Read failures are logged and the read is retried immediately, with no
//! backoff and no attempt limit. End-of-stream ends the loop successfully.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::errors::{MascheraError, ShutdownError, WriteError};
use crate::record::Record;
use crate::redactor::Redactor;
use crate::transport::{RecordSink, RecordSource};

/// State of the masking loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

pub struct Masker {
    redactor: Redactor,
    source: Box<dyn RecordSource>,
    sink: Box<dyn RecordSink>,
    state: LoopState,
}

impl fmt::Debug for Masker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Masker")
            .field("fields", &self.redactor.config().fields())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Masker {
    pub fn new(
        redactor: Redactor,
        source: Box<dyn RecordSource>,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        Self {
            redactor,
            source,
            sink,
            state: LoopState::Stopped,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs the loop until end-of-stream, a fatal write failure, or
    /// cancellation through `cancel` (set to `true` by the controller).
    ///
    /// Returns `Ok(())` on end-of-stream, `Err(MascheraError::Cancelled)` when
    /// cancelled, and `Err(MascheraError::Write(_))` on a fatal write failure.
    pub async fn mask(&mut self, mut cancel: watch::Receiver<bool>) -> Result<(), MascheraError> {
        self.state = LoopState::Running;
        let result = self.run_loop(&mut cancel).await;
        self.state = LoopState::Stopped;
        result
    }

    async fn run_loop(&mut self, cancel: &mut watch::Receiver<bool>) -> Result<(), MascheraError> {
        loop {
            if *cancel.borrow() {
                debug!("Masking loop cancelled before reading");
                return Err(MascheraError::Cancelled);
            }

            let next = tokio::select! {
                biased;
                _ = cancelled(cancel) => {
                    debug!("Masking loop cancelled while waiting for a record");
                    return Err(MascheraError::Cancelled);
                }
                next = self.source.next() => next,
            };

            let record = match next {
                Ok(Some(record)) => record,
                Ok(None) => {
                    info!("PII source reached end of stream");
                    return Ok(());
                }
                Err(err) => {
                    error!("Error reading record from source: {}", err);
                    // Not a backoff: keeps a failing source from starving other tasks.
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            let key = record.key_lossy();
            debug!(
                topic = record.topic.as_str(),
                partition = record.partition,
                offset = record.offset,
                key = key.as_str();
                "Received record"
            );

            let masked = match self.redactor.redact(&record.payload) {
                Ok(masked) => masked,
                Err(err) => {
                    error!(
                        topic = record.topic.as_str(),
                        partition = record.partition,
                        offset = record.offset;
                        "Error masking PII fields, dropping record: {}", err
                    );
                    continue;
                }
            };

            match self.sink.write(&[Record::new(masked)]).await {
                Ok(()) => debug!(offset = record.offset; "Successfully wrote masked record"),
                Err(err @ WriteError::Recoverable(_)) => {
                    warn!(
                        offset = record.offset;
                        "Error writing masked record, continuing: {}", err
                    );
                }
                Err(err @ WriteError::Fatal(_)) => {
                    error!(
                        offset = record.offset;
                        "Error writing masked record, stopping: {}", err
                    );
                    return Err(err.into());
                }
            }
        }
    }

    /// Releases the source and then the sink. Both are always attempted;
    /// every failure is kept.
    pub async fn shutdown(&mut self) -> Result<(), ShutdownError> {
        let mut failures = ShutdownError::new();

        if let Err(err) = self.source.close().await {
            error!("Error closing PII source: {}", err);
            failures.push(err);
        }
        if let Err(err) = self.sink.close().await {
            error!("Error closing masked sink: {}", err);
            failures.push(err);
        }

        failures.into_result()
    }
}

/// Resolves once cancellation has been requested. If the sender is dropped
/// without ever cancelling, it never resolves.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}
