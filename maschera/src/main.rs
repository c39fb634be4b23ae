// maschera/src/main.rs
//! Maschera entry point.
//!
//! Reads settings from the environment (and an optional `.env` file), installs
//! the logger, and runs the masking pipeline until SIGINT/SIGTERM or until the
//! input log ends. Any error returned here yields a non-zero exit code.

use std::time::Duration;

use anyhow::{Context, Result};
use maschera::{build_lifecycle, logger};
use maschera_core::Settings;

/// How long a stopped pipeline waits for blocking I/O threads (such as a
/// pending stdin read) before the process exits anyway.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    // A missing .env file is normal; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env().context("Invalid configuration")?;
    logger::init_logger(settings.app_env);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let result = runtime.block_on(run(settings));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn run(settings: Settings) -> Result<()> {
    log::info!("Starting maschera in '{}' mode", settings.app_env);

    let mut lifecycle = build_lifecycle(&settings).await?;
    lifecycle.run().await.context("Masking pipeline failed")?;

    log::info!("maschera stopped");
    Ok(())
}
