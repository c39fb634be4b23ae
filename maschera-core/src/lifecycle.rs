// maschera-core/src/lifecycle.rs
//! Start, cancellation and ordered shutdown of the masking pipeline.
//!
//! `Lifecycle::run` spawns the masking loop on its own task and waits for
//! either a termination request or the loop's own exit. On a termination
//! request it flips the cancellation channel and waits for the loop to notice.
//! Either way the source and sink are then released through `shutdown`.
//!
//! License: MIT OR APACHE 2.0

use std::future::Future;

use log::{error, info, warn};
use tokio::sync::watch;

use crate::errors::{MascheraError, ShutdownError};
use crate::masker::Masker;

pub struct Lifecycle {
    masker: Option<Masker>,
}

impl Lifecycle {
    pub fn new(masker: Masker) -> Self {
        Self {
            masker: Some(masker),
        }
    }

    /// Runs until SIGINT/SIGTERM or until the loop stops by itself.
    ///
    /// The signal handlers are installed before the loop is spawned.
    pub async fn run(&mut self) -> Result<(), MascheraError> {
        let signal = termination_signal();
        self.run_until(signal).await
    }

    /// Runs until `shutdown_signal` resolves or until the loop stops by itself.
    ///
    /// A cancelled loop counts as success. A fatal write failure is returned
    /// as-is, even when releasing the transports also failed (those failures
    /// are logged). Otherwise any release failure is returned.
    pub async fn run_until<F>(&mut self, shutdown_signal: F) -> Result<(), MascheraError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut masker = self
            .masker
            .take()
            .ok_or_else(|| MascheraError::Fatal("masking pipeline is unavailable".to_string()))?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut task = tokio::spawn(async move {
            let result = masker.mask(cancel_rx).await;
            (masker, result)
        });

        info!("Masking pipeline started");

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = shutdown_signal => {
                info!("Termination requested, waiting for the masking loop to stop");
                // The receiver lives inside the task; if it is already gone the loop has exited.
                let _ = cancel_tx.send(true);
                task.await
            }
        };

        let (masker, outcome) = match joined {
            Ok(joined) => joined,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                return Err(MascheraError::Fatal(format!("masking task did not complete: {}", err)));
            }
        };
        self.masker = Some(masker);

        let outcome = match outcome {
            Err(MascheraError::Cancelled) => Ok(()),
            other => other,
        };

        let released = self.shutdown().await;

        match (outcome, released) {
            (Ok(()), Ok(())) => {
                info!("Masking pipeline stopped cleanly");
                Ok(())
            }
            (Ok(()), Err(shutdown)) => Err(shutdown.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(shutdown)) => {
                error!("Masking pipeline failed and shutdown also reported errors: {}", shutdown);
                Err(err)
            }
        }
    }

    /// Releases the source and the sink, collecting every failure.
    pub async fn shutdown(&mut self) -> Result<(), ShutdownError> {
        match self.masker.as_mut() {
            Some(masker) => masker.shutdown().await,
            None => {
                warn!("Shutdown requested while the masking loop is still running");
                Ok(())
            }
        }
    }
}

/// Installs SIGINT and SIGTERM handlers immediately and returns a future that
/// resolves on the first of them (Ctrl-C on non-unix platforms).
///
/// Must be called from within a Tokio runtime.
pub fn termination_signal() -> impl Future<Output = ()> + Send + 'static {
    #[cfg(unix)]
    let handlers = {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => Some((sigterm, sigint)),
            (Err(err), _) | (_, Err(err)) => {
                warn!("Failed to install unix signal handlers, falling back to Ctrl-C: {}", err);
                None
            }
        }
    };

    async move {
        #[cfg(unix)]
        {
            if let Some((mut sigterm, mut sigint)) = handlers {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
                return;
            }
        }

        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C"),
            Err(err) => {
                error!(
                    "Failed to listen for Ctrl-C, the pipeline can only stop on its own: {}",
                    err
                );
                std::future::pending::<()>().await;
            }
        }
    }
}
