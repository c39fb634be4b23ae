// maschera-core/src/redactor.rs
//! Replaces PII-bearing JSON fields with a keyed digest of the whole record.
//!
//! The payload is parsed into an ordered JSON object (`serde_json` with the
//! `preserve_order` feature), so unconfigured keys keep their position, value
//! and JSON type; numbers keep their original text (`arbitrary_precision`).
//! Every configured key that is present receives the same token: the signer's
//! digest of the raw payload bytes, which doubles as a fingerprint of the
//! record as a whole.
//!
//! License: MIT OR APACHE 2.0

use std::sync::Arc;

use log::debug;
use serde_json::{Map, Value};

use crate::config::MaskingConfig;
use crate::errors::MascheraError;
use crate::signer::Signer;

pub struct Redactor {
    signer: Arc<dyn Signer>,
    config: MaskingConfig,
}

impl Redactor {
    pub fn new(signer: Arc<dyn Signer>, config: MaskingConfig) -> Self {
        Self { signer, config }
    }

    pub fn config(&self) -> &MaskingConfig {
        &self.config
    }

    /// Masks the configured fields of a JSON object payload.
    ///
    /// Fails with `MalformedPayload` when the payload is not a JSON object and
    /// with `Signing` when the signer cannot produce a digest.
    pub fn redact(&self, payload: &[u8]) -> Result<Vec<u8>, MascheraError> {
        let mut document: Map<String, Value> = serde_json::from_slice(payload)?;

        let present: Vec<&str> = self
            .config
            .iter()
            .filter(|field| document.contains_key(*field))
            .collect();

        if !present.is_empty() {
            let digest = self.signer.sign(payload)?;
            for field in &present {
                // Replacing an existing key keeps its position in the map.
                document.insert((*field).to_string(), Value::String(digest.clone()));
            }
            debug!("Masked {} of {} configured PII fields", present.len(), self.config.len());
        }

        Ok(serde_json::to_vec(&document)?)
    }
}
