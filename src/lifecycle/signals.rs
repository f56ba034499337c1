//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGINT (Ctrl-C) and, on Unix, SIGTERM
//! - Translate the first one into a cancellation
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Cancellation is observed between poll attempts, never mid-request

use crate::lifecycle::cancellation::CancellationSource;

/// Wait for the first termination signal.
pub async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Cancel `source` when the process is asked to stop.
pub fn cancel_on_signal(source: CancellationSource) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_termination().await;
        tracing::info!("Termination signal received, cancelling pending lookups");
        source.cancel();
    })
}
