// maschera/src/app.rs
//! Builds the masking pipeline from validated settings.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use maschera_core::{
    open_sink, open_source, HmacSha256Signer, Lifecycle, Masker, Redactor, Settings,
};

/// Opens both transports and assembles signer, redactor, masker and lifecycle.
pub async fn build_lifecycle(settings: &Settings) -> Result<Lifecycle> {
    let source = open_source(
        &settings.topic_pii_path,
        &settings.topic_pii,
        settings.max_record_bytes,
    )
    .await
    .with_context(|| format!("Failed to open PII source '{}'", settings.topic_pii_path))?;

    let sink = open_sink(&settings.topic_masked_path, &settings.topic_masked)
        .await
        .with_context(|| format!("Failed to open masked sink '{}'", settings.topic_masked_path))?;

    let signer = Arc::new(HmacSha256Signer::new(&settings.pii_masker_secret));
    let redactor = Redactor::new(signer, settings.masking.clone());

    info!(
        "Masking {} PII fields from topic '{}' into topic '{}'",
        settings.masking.len(),
        settings.topic_pii,
        settings.topic_masked
    );

    Ok(Lifecycle::new(Masker::new(redactor, source, sink)))
}
