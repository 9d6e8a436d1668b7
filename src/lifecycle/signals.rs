//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and SIGTERM both mean graceful shutdown. There is no
//! reload signal; configuration is read once at startup.

use tokio::signal;

use crate::lifecycle::Shutdown;

/// Wait for SIGINT or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed that signal is never observed; the other
/// one still works.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Trigger `shutdown` on the first termination signal.
pub fn spawn_signal_handler(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    })
}
