// maschera-core/src/transport/lines.rs
//! Newline-delimited records over async byte streams.
//!
//! Each non-blank line of the input is one record payload; each masked record
//! is written as one line of output. The endpoint `-` selects stdin/stdout,
//! anything else is a file path (the output file is appended to, so a
//! restarted process never truncates what it already produced).
//!
//! A line sink treats a successful flush as the durable acknowledgment of a
//! write.
//!
//! License: MIT OR APACHE 2.0

use async_trait::async_trait;
use log::{debug, info};
use tokio::fs::OpenOptions;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::errors::{MascheraError, SourceError, WriteError};
use crate::record::Record;
use crate::transport::{RecordSink, RecordSource};

/// Endpoint name selecting the process's standard streams.
pub const STDIO_ENDPOINT: &str = "-";

pub struct LineSource<R> {
    reader: R,
    topic: String,
    next_offset: i64,
    max_record_bytes: usize,
    buf: Vec<u8>,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, topic: impl Into<String>, max_record_bytes: usize) -> Self {
        Self {
            reader,
            topic: topic.into(),
            next_offset: 0,
            max_record_bytes,
            buf: Vec::new(),
        }
    }
}

/// What a single call to `LineSource::read_bounded_line` found.
enum Line {
    Eof,
    Blank,
    Record,
    TooLarge(usize),
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Reads one line into `buf`, without its terminator. At most
    /// `max_record_bytes` plus a `\r\n` is ever kept; the rest of an oversized
    /// line is consumed from the reader and discarded.
    async fn read_bounded_line(&mut self) -> io::Result<Line> {
        self.buf.clear();
        let keep = self.max_record_bytes.saturating_add(2);
        let mut size = 0usize;
        let mut last = None;
        let mut blank = true;
        let mut terminated = false;

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            let (used, content) = match available.iter().position(|b| *b == b'\n') {
                Some(i) => {
                    terminated = true;
                    (i + 1, &available[..i])
                }
                None => (available.len(), available),
            };

            if let Some(&b) = content.last() {
                last = Some(b);
            }
            blank &= content.iter().all(u8::is_ascii_whitespace);
            size = size.saturating_add(content.len());
            if size <= keep {
                self.buf.extend_from_slice(content);
            }

            self.reader.consume(used);
            if terminated {
                break;
            }
        }

        if size == 0 && !terminated {
            return Ok(Line::Eof);
        }
        if blank {
            return Ok(Line::Blank);
        }
        if last == Some(b'\r') {
            size -= 1;
        }
        if size > self.max_record_bytes {
            return Ok(Line::TooLarge(size));
        }
        self.buf.truncate(size);
        Ok(Line::Record)
    }
}

#[async_trait]
impl<R> RecordSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next(&mut self) -> Result<Option<Record>, SourceError> {
        loop {
            let line = self.read_bounded_line().await?;
            let offset = self.next_offset;

            match line {
                Line::Eof => return Ok(None),
                Line::Blank => continue,
                Line::TooLarge(size) => {
                    self.next_offset += 1;
                    return Err(SourceError::RecordTooLarge {
                        offset,
                        size,
                        limit: self.max_record_bytes,
                    });
                }
                Line::Record => {
                    self.next_offset += 1;
                    let record = Record::new(self.buf.as_slice());
                    return Ok(Some(record.at(self.topic.as_str(), 0, offset)));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), MascheraError> {
        debug!(
            "Closing line source for topic '{}' after {} records",
            self.topic, self.next_offset
        );
        Ok(())
    }
}

pub struct LineSink<W> {
    writer: W,
    topic: String,
}

impl<W> LineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, topic: impl Into<String>) -> Self {
        Self {
            writer,
            topic: topic.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> RecordSink for LineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, records: &[Record]) -> Result<(), WriteError> {
        for record in records {
            self.writer
                .write_all(&record.payload)
                .await
                .map_err(WriteError::from_io)?;
            self.writer.write_all(b"\n").await.map_err(WriteError::from_io)?;
        }
        self.writer.flush().await.map_err(WriteError::from_io)
    }

    async fn close(&mut self) -> Result<(), MascheraError> {
        debug!("Closing line sink for topic '{}'", self.topic);
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Opens the input log named by `endpoint`.
pub async fn open_source(
    endpoint: &str,
    topic: &str,
    max_record_bytes: usize,
) -> Result<Box<dyn RecordSource>, MascheraError> {
    if endpoint == STDIO_ENDPOINT {
        info!("Reading topic '{}' from stdin", topic);
        return Ok(Box::new(LineSource::new(
            BufReader::new(io::stdin()),
            topic,
            max_record_bytes,
        )));
    }

    info!("Reading topic '{}' from {}", topic, endpoint);
    let file = tokio::fs::File::open(endpoint).await?;
    Ok(Box::new(LineSource::new(BufReader::new(file), topic, max_record_bytes)))
}

/// Opens the output log named by `endpoint`, creating the file if needed.
pub async fn open_sink(endpoint: &str, topic: &str) -> Result<Box<dyn RecordSink>, MascheraError> {
    if endpoint == STDIO_ENDPOINT {
        info!("Writing topic '{}' to stdout", topic);
        return Ok(Box::new(LineSink::new(io::stdout(), topic)));
    }

    info!("Writing topic '{}' to {}", topic, endpoint);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(endpoint)
        .await?;
    Ok(Box::new(LineSink::new(file, topic)))
}
