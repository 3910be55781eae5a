//! Signal handling for graceful process shutdown.

use tokio::signal;

/// Resolves on `SIGINT` (Ctrl+C) or, on Unix, `SIGTERM` — whichever arrives
/// first. Used to drive a component's shutdown `CancellationToken` from
/// outside the HTTP server loop.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
