//! Web router using Axum

use axum::{
    response::Html,
    routing::{delete, get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use verboard_core::VersionManager;

use crate::{api, sse, ws};

/// Create the web router
///
/// With `static_dir`, unmatched paths are served from that directory;
/// otherwise a placeholder page answers them.
pub fn create_router(manager: Arc<VersionManager>, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/health", get(api::health))
        .route("/api/status", get(api::status))
        .route("/api/versions", get(api::versions))
        .route("/api/backups", get(api::versions))
        .route("/api/backup", post(api::create_backup))
        .route("/api/backup/{filename}", delete(api::delete_backup))
        .route("/api/switch", post(api::switch_version))
        .route("/api/changelog/{version1}/{version2}", get(api::changelog))
        .route("/api/restore-points", get(api::restore_points))
        .route("/api/events", get(sse::sse_handler))
        .route("/api/{*rest}", axum::routing::any(api::not_found))
        .route("/ws", get(ws::ws_handler))
        .route("/backups/{filename}", get(api::download_backup));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(index_handler),
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(manager)
}

async fn index_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>verboard - Version Dashboard</title>
    <style>
        body {
            font-family: system-ui, -apple-system, sans-serif;
            background: #f5f5f5;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
        }
        .setup-message {
            max-width: 600px;
            background: white;
            padding: 2rem;
            border-radius: 8px;
            box-shadow: 0 2px 8px rgba(0,0,0,0.1);
        }
        code {
            background: #f0f0f0;
            padding: 0.25rem 0.5rem;
            border-radius: 4px;
        }
        a { color: #0066cc; text-decoration: none; }
    </style>
</head>
<body>
    <div class="setup-message">
        <h1>verboard</h1>
        <p>No dashboard assets configured. Start the server with
           <code>verboard serve --static-dir ./public</code> to serve a frontend.</p>
        <p><strong>API Endpoints:</strong></p>
        <ul>
            <li><a href="/api/health">/api/health</a> - Health check</li>
            <li><a href="/api/status">/api/status</a> - System status</li>
            <li><a href="/api/versions">/api/versions</a> - Available backups</li>
            <li><a href="/api/restore-points">/api/restore-points</a> - Git tags</li>
            <li><code>/api/events</code> - Server-Sent Events</li>
            <li><code>/ws</code> - WebSocket channel</li>
        </ul>
    </div>
</body>
</html>"#,
    )
}
