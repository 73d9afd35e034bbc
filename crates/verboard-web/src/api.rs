//! JSON API handlers
//!
//! Each handler validates its input, makes one call into the version manager
//! and wraps the outcome. Failures always leave as `{"error": "..."}`.

use axum::body::{Body, Bytes};
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error};
use verboard_core::error::ErrorCategory;
use verboard_core::models::{
    BackupRequest, BackupResult, Changelog, RestorePoint, SwitchRequest, SwitchResult,
    SystemStatus, VersionEntry,
};
use verboard_core::{CoreError, VersionManager};

/// Error leaving the API as a `{error}` body
#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    BadRequest(String),
    NotFound(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Core(e) => status_for(e),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Core(e) => e.to_string(),
            ApiError::BadRequest(m) | ApiError::NotFound(m) => m.clone(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError::Core(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// HTTP status for a core error
pub fn status_for(error: &CoreError) -> StatusCode {
    if error.is_not_found() {
        return StatusCode::NOT_FOUND;
    }
    match error.category() {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::Auth => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Body parsing that reports malformed input as 400 instead of 422
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

pub async fn health(State(manager): State<Arc<VersionManager>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "sessions": manager.hub().session_count(),
        "backupsDir": manager.config().backups_dir.display().to_string(),
    }))
}

pub async fn status(State(manager): State<Arc<VersionManager>>) -> Json<SystemStatus> {
    Json(manager.status().await)
}

pub async fn versions(
    State(manager): State<Arc<VersionManager>>,
) -> Result<Json<Vec<VersionEntry>>, ApiError> {
    Ok(Json(manager.versions().await?))
}

/// `POST /api/backup`; an empty body means a default stable backup
pub async fn create_backup(
    State(manager): State<Arc<VersionManager>>,
    body: Bytes,
) -> Result<Json<BackupResult>, ApiError> {
    let request: BackupRequest = if body.iter().all(u8::is_ascii_whitespace) {
        BackupRequest::default()
    } else {
        parse_body(&body)?
    };

    Ok(Json(manager.create_backup(request).await?))
}

pub async fn switch_version(
    State(manager): State<Arc<VersionManager>>,
    body: Bytes,
) -> Result<Json<SwitchResult>, ApiError> {
    let request: SwitchRequest = parse_body(&body)?;
    Ok(Json(manager.switch_version(request.version()).await?))
}

pub async fn delete_backup(
    State(manager): State<Arc<VersionManager>>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    manager.delete_backup(&filename).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn changelog(
    State(manager): State<Arc<VersionManager>>,
    Path((version1, version2)): Path<(String, String)>,
) -> Result<Json<Changelog>, ApiError> {
    Ok(Json(manager.changelog(&version1, &version2)?))
}

pub async fn restore_points(
    State(manager): State<Arc<VersionManager>>,
) -> Json<Vec<RestorePoint>> {
    Json(manager.restore_points().await)
}

/// `GET /backups/{filename}`: serve the artifact as an attachment
///
/// `ServeFile` supplies content type, length and range handling.
pub async fn download_backup(
    State(manager): State<Arc<VersionManager>>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let path = manager.backup_path(&filename).await?;

    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            filename.replace(['"', '\\'], "_")
        );
        response.headers_mut().insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
        );
    }

    debug!(path = %path.display(), status = %response.status(), "Serving backup download");
    Ok(response)
}

/// Unknown `/api/*` routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
