// maschera-core/src/lib.rs
//! # Maschera Core Library
//!
//! `maschera-core` provides the masking pipeline behind `maschera`: it reads JSON
//! records from one event log, replaces PII-bearing fields with a keyed digest,
//! and appends the result to a second log.
//!
//! ## Modules
//!
//! * `config`: `Settings` read from the environment and the `MaskingConfig` field set.
//! * `signer`: the `Signer` trait and its HMAC-SHA256 implementation.
//! * `redactor`: field detection and replacement over an ordered JSON document.
//! * `record`: the `Record` exchanged with the logs.
//! * `transport`: the `RecordSource`/`RecordSink` traits, plus in-memory and
//!   line-delimited implementations.
//! * `masker`: the consume/produce loop and its per-record error policy.
//! * `lifecycle`: start, cooperative cancellation and ordered shutdown.
//! * `errors`: the crate's error types.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use maschera_core::{HmacSha256Signer, MaskingConfig, Redactor};
//!
//! fn main() -> anyhow::Result<()> {
//!     let redactor = Redactor::new(
//!         Arc::new(HmacSha256Signer::new("some-super-secret-value")),
//!         MaskingConfig::new(["email"])?,
//!     );
//!
//!     let masked = redactor.redact(br#"{"email":"someone@example.com","plan":"pro"}"#)?;
//!     let masked: serde_json::Value = serde_json::from_slice(&masked)?;
//!     assert_eq!(masked["plan"], "pro");
//!     assert_ne!(masked["email"], "someone@example.com");
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`MascheraError`]. Sink writes fail with the closed
//! [`WriteError`] enum so that callers branch on `Recoverable` versus `Fatal`, and
//! shutdown failures are gathered into a [`ShutdownError`].
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod masker;
pub mod record;
pub mod redactor;
pub mod signer;
pub mod transport;

/// Re-exports the configuration types used to build a pipeline.
pub use config::{AppEnv, ConfigError, MaskingConfig, Settings, DEFAULT_MAX_RECORD_BYTES};

/// Re-exports the custom error types for clear error reporting.
pub use errors::{MascheraError, ShutdownError, SourceError, WriteError};

pub use lifecycle::{termination_signal, Lifecycle};
pub use masker::{LoopState, Masker};
pub use record::Record;
pub use redactor::Redactor;
pub use signer::{HmacSha256Signer, Signer};

/// Re-exports the transport traits and the bundled implementations.
pub use transport::{
    open_sink, open_source, LineSink, LineSource, MemorySink, MemorySource, RecordSink,
    RecordSource, STDIO_ENDPOINT,
};
