// maschera/tests/cli_integration_tests.rs
//! Integration tests for the `maschera` binary.
//!
//! The binary takes no arguments; everything is driven through environment
//! variables, stdin/stdout or files, and process signals.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const PII_RECORD: &str =
    r#"{"email":"someone@example.com","firstName":"Kelly","lastName":"Baskerson"}"#;
const MASKED_RECORD: &str = r#"{"email":"upwFtySM0mBjNxUdZAAy6D7LXMC22idHTwXp_HWuVHs=","firstName":"upwFtySM0mBjNxUdZAAy6D7LXMC22idHTwXp_HWuVHs=","lastName":"upwFtySM0mBjNxUdZAAy6D7LXMC22idHTwXp_HWuVHs="}"#;

const ALL_VARS: &[&str] = &[
    "APP_ENV",
    "JSON_FIELDS_WITH_PII",
    "PII_MASKER_SECRET",
    "TOPIC_PII",
    "TOPIC_MASKED",
    "TOPIC_PII_PATH",
    "TOPIC_MASKED_PATH",
    "MAX_RECORD_BYTES",
    "RUST_LOG",
];

/// A command with a clean, valid environment reading stdin and writing stdout.
fn maschera_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("maschera"));
    for var in ALL_VARS {
        cmd.env_remove(var);
    }
    cmd.env("APP_ENV", "test")
        .env("JSON_FIELDS_WITH_PII", "email,firstName,lastName")
        .env("PII_MASKER_SECRET", "some-super-secret-value")
        .env("TOPIC_PII", "pii_data")
        .env("TOPIC_MASKED", "masked_data")
        .env("TOPIC_PII_PATH", "-")
        .env("TOPIC_MASKED_PATH", "-");
    cmd
}

#[test]
fn test_masks_stdin_to_stdout() {
    let input = format!(
        "{}\nnot-json\n{}\n",
        PII_RECORD, r#"{"orderId":7,"email":"x@example.com","total":3.5}"#
    );

    let output = maschera_cmd().write_stdin(input).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], MASKED_RECORD);
    assert!(lines[1].starts_with(r#"{"orderId":7,"email":""#));
    assert!(lines[1].ends_with(r#"","total":3.5}"#));
    assert!(!lines[1].contains("x@example.com"));
}

#[test]
fn test_empty_stdin_exits_cleanly() {
    maschera_cmd()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_missing_secret_fails_before_reading() {
    maschera_cmd()
        .env_remove("PII_MASKER_SECRET")
        .write_stdin(format!("{}\n", PII_RECORD))
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Missing required environment variable PII_MASKER_SECRET",
        ));
}

#[test]
fn test_blank_pii_field_is_rejected() {
    maschera_cmd()
        .env("JSON_FIELDS_WITH_PII", "email, ,lastName")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Required environment variable JSON_FIELDS_WITH_PII cannot contain empty elements",
        ));
}

#[test]
fn test_invalid_app_env_is_rejected() {
    maschera_cmd()
        .env("APP_ENV", "staging")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Invalid value 'staging' for environment variable APP_ENV",
        ));
}

#[test]
fn test_missing_input_file_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.jsonl");

    maschera_cmd()
        .env("TOPIC_PII_PATH", &missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open PII source"));
}

#[test]
fn test_file_to_file_appends_masked_records() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("pii_data.jsonl");
    let output = dir.path().join("masked_data.jsonl");
    fs::write(&input, format!("{}\n", PII_RECORD)).unwrap();
    fs::write(&output, "{\"existing\":true}\n").unwrap();

    maschera_cmd()
        .env("TOPIC_PII_PATH", &input)
        .env("TOPIC_MASKED_PATH", &output)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        format!("{{\"existing\":true}}\n{}\n", MASKED_RECORD)
    );
}

#[cfg(unix)]
#[test]
fn test_sigterm_stops_a_live_pipeline() {
    use std::io::Write;
    use std::process::Stdio;
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    let dir = tempdir().unwrap();
    let output = dir.path().join("masked_data.jsonl");

    let mut cmd = std::process::Command::new(assert_cmd::cargo_bin!("maschera"));
    for var in ALL_VARS {
        cmd.env_remove(var);
    }
    let mut child = cmd
        .env("APP_ENV", "test")
        .env("JSON_FIELDS_WITH_PII", "email,firstName,lastName")
        .env("PII_MASKER_SECRET", "some-super-secret-value")
        .env("TOPIC_PII", "pii_data")
        .env("TOPIC_MASKED", "masked_data")
        .env("TOPIC_PII_PATH", "-")
        .env("TOPIC_MASKED_PATH", &output)
        .stdin(Stdio::piped())
        .spawn()
        .unwrap();

    // Keep stdin open so the pipeline stays live after the first record.
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "{}", PII_RECORD).unwrap();
    stdin.flush().unwrap();

    wait_for_contents(&output, Duration::from_secs(10));
    // Give the controller time to install its signal handlers.
    sleep(Duration::from_millis(200));

    let status = std::process::Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("maschera did not stop after SIGTERM");
        }
        sleep(Duration::from_millis(20));
    };
    drop(stdin);

    assert!(exit.success(), "unexpected exit status: {:?}", exit);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        format!("{}\n", MASKED_RECORD)
    );
}

#[cfg(unix)]
fn wait_for_contents(path: &Path, timeout: std::time::Duration) {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if fs::read_to_string(path).map(|s| s.ends_with('\n')).unwrap_or(false) {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    panic!("no masked output appeared in {}", path.display());
}
