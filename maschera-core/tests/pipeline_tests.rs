// maschera-core/tests/pipeline_tests.rs
//! End-to-end runs of the masking pipeline over file-backed line transports.

use anyhow::Result;
use std::sync::Arc;
use tempfile::tempdir;

use maschera_core::{
    open_sink, open_source, HmacSha256Signer, Lifecycle, MaskingConfig, Masker, Redactor,
    Signer,
};

const SECRET: &str = "some-super-secret-value";
const DIGEST: &str = "upwFtySM0mBjNxUdZAAy6D7LXMC22idHTwXp_HWuVHs=";

async fn run_pipeline(input: &str, fields: &[&str]) -> Result<Vec<String>> {
    let dir = tempdir()?;
    let input_path = dir.path().join("pii_data.jsonl");
    let output_path = dir.path().join("masked_data.jsonl");
    std::fs::write(&input_path, input)?;

    let source = open_source(input_path.to_str().unwrap(), "pii_data", 1_000_000).await?;
    let sink = open_sink(output_path.to_str().unwrap(), "masked_data").await?;
    let redactor = Redactor::new(
        Arc::new(HmacSha256Signer::new(SECRET)),
        MaskingConfig::new(fields.iter().copied())?,
    );

    let mut lifecycle = Lifecycle::new(Masker::new(redactor, source, sink));
    lifecycle.run_until(std::future::pending()).await?;

    let written = std::fs::read_to_string(&output_path)?;
    Ok(written.lines().map(str::to_string).collect())
}

#[tokio::test]
async fn test_masks_every_configured_field_with_one_digest() -> Result<()> {
    let input =
        "{\"email\":\"someone@example.com\",\"firstName\":\"Kelly\",\"lastName\":\"Baskerson\"}\n";
    let lines = run_pipeline(input, &["email", "firstName", "lastName"]).await?;

    assert_eq!(
        lines,
        vec![format!(
            "{{\"email\":\"{0}\",\"firstName\":\"{0}\",\"lastName\":\"{0}\"}}",
            DIGEST
        )]
    );
    Ok(())
}

#[tokio::test]
async fn test_malformed_records_are_skipped_in_order() -> Result<()> {
    let input = concat!(
        "{\"email\":\"first@example.com\",\"id\":1}\n",
        "not-json\n",
        "[\"an\",\"array\"]\n",
        "{\"email\":\"second@example.com\",\"id\":2}\n",
    );
    let lines = run_pipeline(input, &["email"]).await?;

    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(&lines[0])?;
    let second: serde_json::Value = serde_json::from_str(&lines[1])?;
    assert_eq!(first["id"], 1);
    assert_eq!(second["id"], 2);

    let signer = HmacSha256Signer::new(SECRET);
    assert_eq!(
        first["email"],
        signer.sign(b"{\"email\":\"first@example.com\",\"id\":1}")?
    );
    assert_eq!(
        second["email"],
        signer.sign(b"{\"email\":\"second@example.com\",\"id\":2}")?
    );
    Ok(())
}

#[tokio::test]
async fn test_differently_shaped_records_keep_other_keys() -> Result<()> {
    let input = concat!(
        "{\"orderId\":\"A-17\",\"email\":\"buyer@example.com\",",
        "\"total\":19.99,\"items\":[1,2]}\n",
    );
    let lines = run_pipeline(input, &["email", "firstName", "lastName"]).await?;

    let masked: serde_json::Value = serde_json::from_str(&lines[0])?;
    let object = masked.as_object().unwrap();
    assert_eq!(object.len(), 4);
    assert_eq!(masked["orderId"], "A-17");
    assert_eq!(masked["total"], 19.99);
    assert_eq!(masked["items"], serde_json::json!([1, 2]));
    assert!(!object.contains_key("firstName"));
    assert_ne!(masked["email"], "buyer@example.com");
    Ok(())
}

#[tokio::test]
async fn test_empty_input_produces_empty_output() -> Result<()> {
    assert!(run_pipeline("", &["email"]).await?.is_empty());
    Ok(())
}
