//! verboard-web - HTTP API, SSE and WebSocket server for verboard

pub mod api;
pub mod router;
pub mod sse;
pub mod ws;

pub use router::create_router;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use verboard_core::{FileWatcher, VersionManager};

/// Run the web server until Ctrl-C / SIGTERM
///
/// Also owns the background pieces that only make sense while serving: the
/// backups directory watcher and the periodic status publisher.
pub async fn run(
    manager: Arc<VersionManager>,
    addr: SocketAddr,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    manager
        .ensure_layout()
        .await
        .context("Failed to prepare backups directory")?;

    let config = manager.config().clone();
    let watcher = FileWatcher::start(
        config.backups_dir.clone(),
        Arc::clone(&manager),
        config.watcher.clone(),
    )
    .await
    .with_context(|| format!("Failed to watch {}", config.backups_dir.display()))?;

    let publisher = config
        .status_interval
        .map(|period| manager.spawn_status_publisher(period));

    let router = create_router(Arc::clone(&manager), static_dir);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, auth = manager.hub().auth_required(), "Web server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    watcher.stop().await;
    if let Some(handle) = publisher {
        handle.abort();
    }
    info!("Web server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
