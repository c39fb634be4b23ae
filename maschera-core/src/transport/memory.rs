//! In-memory implementations of the transport traits.
//!
//! Both halves are cheap `Clone` handles over shared state, so a test can hand
//! one clone to the masking engine and keep another to script behaviour and
//! inspect what happened.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::{MascheraError, SourceError, WriteError};
use crate::record::Record;
use crate::transport::{RecordSink, RecordSource};

#[derive(Debug, Default)]
struct SourceState {
    pending: VecDeque<Result<Record, SourceError>>,
    hold_open: bool,
    reads: usize,
    closed: bool,
    close_error: Option<String>,
}

/// A scripted source: yields queued records and read failures in order, then
/// either reports end-of-stream or, when held open, waits forever.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<SourceState>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues plain JSON payloads with sequential offsets on partition 0.
    pub fn from_payloads<I, P>(topic: &str, payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        let pending = payloads
            .into_iter()
            .enumerate()
            .map(|(offset, payload)| Ok(Record::new(payload).at(topic, 0, offset as i64)))
            .collect();
        Self {
            state: Arc::new(Mutex::new(SourceState {
                pending,
                ..Default::default()
            })),
        }
    }

    pub async fn push_record(&self, record: Record) {
        self.state.lock().await.pending.push_back(Ok(record));
    }

    pub async fn push_error(&self, err: SourceError) {
        self.state.lock().await.pending.push_back(Err(err));
    }

    /// Instead of reporting end-of-stream once drained, block like a live log
    /// with no new traffic.
    pub async fn hold_open(&self) {
        self.state.lock().await.hold_open = true;
    }

    pub async fn fail_close(&self, message: &str) {
        self.state.lock().await.close_error = Some(message.to_string());
    }

    pub async fn remaining(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Number of `next` calls that returned (records, errors and end-of-stream).
    pub async fn reads(&self) -> usize {
        self.state.lock().await.reads
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn next(&mut self) -> Result<Option<Record>, SourceError> {
        let mut state = self.state.lock().await;
        match state.pending.pop_front() {
            Some(item) => {
                state.reads += 1;
                item.map(Some)
            }
            None if state.hold_open => {
                drop(state);
                std::future::pending().await
            }
            None => {
                state.reads += 1;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<(), MascheraError> {
        let mut state = self.state.lock().await;
        state.closed = true;
        match &state.close_error {
            Some(message) => Err(MascheraError::Fatal(message.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct SinkState {
    written: Vec<Record>,
    outcomes: VecDeque<WriteError>,
    attempts: usize,
    closed: bool,
    close_error: Option<String>,
}

/// A recording sink. Writes succeed unless a failure has been scripted with
/// `fail_next_write`; failed writes are not recorded.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    topic: String,
    state: Arc<Mutex<SinkState>>,
}

impl MemorySink {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            state: Arc::default(),
        }
    }

    pub async fn fail_next_write(&self, err: WriteError) {
        self.state.lock().await.outcomes.push_back(err);
    }

    pub async fn fail_close(&self, message: &str) {
        self.state.lock().await.close_error = Some(message.to_string());
    }

    pub async fn written(&self) -> Vec<Record> {
        self.state.lock().await.written.clone()
    }

    pub async fn written_payloads(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .written
            .iter()
            .map(|r| String::from_utf8_lossy(&r.payload).into_owned())
            .collect()
    }

    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&mut self, records: &[Record]) -> Result<(), WriteError> {
        let mut state = self.state.lock().await;
        state.attempts += 1;
        if let Some(err) = state.outcomes.pop_front() {
            return Err(err);
        }
        for record in records {
            let offset = state.written.len() as i64;
            state
                .written
                .push(record.clone().at(self.topic.as_str(), 0, offset));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MascheraError> {
        let mut state = self.state.lock().await;
        state.closed = true;
        match &state.close_error {
            Some(message) => Err(MascheraError::Fatal(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_source_drains_then_reports_end_of_stream() {
        let mut source = MemorySource::from_payloads("pii", ["{}", "{\"a\":1}"]);
        source.push_error(SourceError::Transport("broker unreachable".into())).await;

        let first = source.next().await.unwrap().unwrap();
        assert_eq!((first.topic.as_str(), first.offset), ("pii", 0));
        assert_eq!(source.next().await.unwrap().unwrap().offset, 1);
        assert!(source.next().await.is_err());
        assert!(source.next().await.unwrap().is_none());
        assert_eq!(source.reads().await, 4);
    }

    #[tokio::test]
    async fn test_held_open_source_blocks() {
        let mut source = MemorySource::new();
        source.hold_open().await;
        let waited = tokio::time::timeout(Duration::from_millis(50), source.next()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_sink_records_writes_and_scripted_failures() {
        let mut sink = MemorySink::new("masked");
        sink.fail_next_write(WriteError::Recoverable("partition offline".into())).await;

        assert!(sink.write(&[Record::new("first")]).await.is_err());
        sink.write(&[Record::new("second")]).await.unwrap();

        assert_eq!(sink.attempts().await, 2);
        let written = sink.written().await;
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].topic, "masked");
        assert_eq!(written[0].payload, b"second");
    }

    #[tokio::test]
    async fn test_close_marks_closed_and_reports_scripted_failure() {
        let mut sink = MemorySink::new("masked");
        sink.fail_close("flush timed out").await;
        assert!(sink.close().await.is_err());
        assert!(sink.is_closed().await);

        let mut source = MemorySource::new();
        assert!(source.close().await.is_ok());
        assert!(source.is_closed().await);
    }
}
