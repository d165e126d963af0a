//! Plugin socket lifecycle.

use std::future::Future;
use std::path::Path;

use lizard_volume::{SharedDriver, ShutdownReport};
use tokio::net::UnixListener;

use crate::api;

/// Bind the plugin socket at `socket_path`.
///
/// Creates the parent directory and removes a stale socket left behind by a
/// previous run.
pub async fn bind(socket_path: &Path) -> anyhow::Result<UnixListener> {
    if let Some(parent) = socket_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if socket_path.exists() {
        tracing::debug!(path = %socket_path.display(), "Removing stale plugin socket");
        tokio::fs::remove_file(socket_path).await?;
    }

    let listener = UnixListener::bind(socket_path)?;
    tracing::info!(path = %socket_path.display(), "Starting plugin API server");
    Ok(listener)
}

/// Serve the plugin API until `shutdown` resolves, then unmount everything.
///
/// The socket file is removed once the server has stopped.
pub async fn run(
    driver: SharedDriver,
    listener: UnixListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<ShutdownReport> {
    let socket_path = listener
        .local_addr()?
        .as_pathname()
        .map(Path::to_path_buf);

    let app = api::server::app(driver.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    let report = driver.lock().await.shutdown().await;

    if let Some(path) = socket_path {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::debug!(path = %path.display(), error = %e, "Could not remove plugin socket");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(report)
}

/// Resolve on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
