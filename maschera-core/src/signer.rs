// maschera-core/src/signer.rs
//! Keyed digests used as redaction tokens.
//!
//! A `Signer` turns an arbitrary byte sequence into a fixed-length token that
//! is deterministic for a given secret. The default implementation is
//! HMAC-SHA256 encoded as padded URL-safe Base64, which is always valid JSON
//! string content.
//!
//! License: MIT OR APACHE 2.0

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::MascheraError;

type HmacSha256 = Hmac<Sha256>;

/// Produces a deterministic, secret-keyed digest of a message.
///
/// Implementations hold no mutable state, so a single signer can be shared
/// between tasks behind an `Arc` without locking.
pub trait Signer: Send + Sync {
    fn sign(&self, message: &[u8]) -> Result<String, MascheraError>;
}

/// HMAC-SHA256 signer.
#[derive(Clone)]
pub struct HmacSha256Signer {
    secret: Vec<u8>,
}

impl HmacSha256Signer {
    /// The secret is expected to be non-empty; configuration loading rejects
    /// blank secrets before a signer is ever built.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }
}

impl Signer for HmacSha256Signer {
    fn sign(&self, message: &[u8]) -> Result<String, MascheraError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| {
            MascheraError::Signing(format!("Failed to initialize HMAC-SHA256: {}", e))
        })?;
        mac.update(message);
        Ok(general_purpose::URL_SAFE.encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for HmacSha256Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Signer").finish_non_exhaustive()
    }
}
