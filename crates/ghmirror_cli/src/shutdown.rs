use ghmirror::Shutdown;

/// Set up the Ctrl+C handler for graceful shutdown.
///
/// The first Ctrl+C requests shutdown on `shutdown`; a second one exits
/// immediately.
pub(crate) fn setup_shutdown_handler(shutdown: Shutdown) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            return;
        }

        tracing::warn!("Shutdown requested, finishing current operations (Ctrl+C again to force quit)");
        shutdown.request();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Force quit");
            std::process::exit(130);
        }
    });
}
