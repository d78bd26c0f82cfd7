//! HTTP surface.
//!
//! Routes JSON requests to the project store, the export writer and the image
//! operations, and serves the front-end plus exported files from disk.
//!
//! | Method & path | Handler |
//! |---|---|
//! | `POST /api/save-project` | [`ProjectStore::save`] |
//! | `GET /api/load-project/{id}` | [`ProjectStore::load`] |
//! | `GET /api/list-projects` | [`ProjectStore::list`] |
//! | `DELETE /api/delete-project/{id}` | [`ProjectStore::delete`] |
//! | `POST /api/export-image` | [`ExportWriter::export`] |
//! | `POST /api/apply-filter` | [`filter_data_url`] |
//! | `POST /api/resize-image` | [`resize_data_url`] |
//! | `GET /api/health` | liveness |
//! | `GET /exports/{file}` | export directory |
//! | `GET /`, `GET /{path}` | static directory |
//!
//! Every API response is JSON with a boolean `success` field. Failures become
//! `{"success": false, "error": "<message>"}` with the status picked by
//! [`ErrorKind::status`]. That includes bodies the extractor refuses, such as
//! one over `server.max_body_bytes` (413).
//!
//! Image work and filesystem calls run on the blocking pool so they never
//! stall the async workers.

use crate::config::ServerConfig;
use crate::error::ErrorKind;
use crate::export::{EXPORTS_ROUTE, ExportError, ExportWriter};
use crate::imaging::{
    ImageSettings, ImagingError, Quality, decode_data_url, filter_data_url, resize_data_url,
};
use crate::store::{ProjectStore, ProjectSummary, StoreError};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, FromRequest, Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    MissingParameters(&'static str),
    #[error("Could not read request body: {0}")]
    Body(#[from] BytesRejection),
    #[error("Invalid JSON body: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Imaging(#[from] ImagingError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingParameters(_) | ApiError::InvalidBody(_) => ErrorKind::MalformedInput,
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                ErrorKind::PayloadTooLarge
            }
            ApiError::Body(_) => ErrorKind::MalformedInput,
            ApiError::Store(e) => e.kind(),
            ApiError::Imaging(e) => e.kind(),
            ApiError::Export(e) => e.kind(),
            ApiError::Task(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind().status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorEnvelope {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run blocking work (codec, pixels, filesystem) off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// A JSON request body whose rejections (size limit, unreadable body, bad
/// JSON) come back in the error envelope instead of axum's plain-text ones.
struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        Ok(Self(serde_json::from_slice(&bytes)?))
    }
}

/// A required, non-empty string field.
fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

// =============================================================================
// State
// =============================================================================

/// Everything a handler needs, shared across requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<ProjectStore>,
    pub exports: Arc<ExportWriter>,
    pub images: ImageSettings,
    pub default_format: Arc<str>,
    pub default_quality: Quality,
    pub static_dir: PathBuf,
    pub max_body_bytes: usize,
}

impl AppState {
    /// Build state from config, creating the storage directories.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StoreError> {
        Ok(Self {
            store: Arc::new(ProjectStore::open(&config.storage.projects_dir)?),
            exports: Arc::new(ExportWriter::open(&config.storage.exports_dir)?),
            images: config.image_settings(),
            default_format: Arc::from(config.export.format.as_str()),
            default_quality: config.default_quality(),
            static_dir: config.storage.static_dir.clone(),
            max_body_bytes: config.server.max_body_bytes,
        })
    }
}

/// Assemble the full application router.
pub fn router(state: AppState) -> Router {
    let exports = ServeDir::new(state.exports.dir());
    let static_files = ServeDir::new(&state.static_dir);
    let body_limit = state.max_body_bytes;

    Router::new()
        .route("/api/save-project", post(save_project))
        .route("/api/load-project/{project_id}", get(load_project))
        .route("/api/list-projects", get(list_projects))
        .route("/api/delete-project/{project_id}", delete(delete_project))
        .route("/api/export-image", post(export_image))
        .route("/api/apply-filter", post(apply_filter))
        .route("/api/resize-image", post(resize_image))
        .route("/api/health", get(health))
        .nest_service(EXPORTS_ROUTE, exports)
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Serialize)]
struct SaveResponse {
    success: bool,
    project_id: String,
    message: &'static str,
}

async fn save_project(
    State(state): State<AppState>,
    JsonBody(document): JsonBody<Value>,
) -> ApiResult<SaveResponse> {
    let store = state.store.clone();
    let project_id = blocking(move || Ok(store.save(&document)?)).await?;

    info!(%project_id, "project saved");
    Ok(Json(SaveResponse {
        success: true,
        project_id,
        message: "Project saved successfully",
    }))
}

#[derive(Debug, Serialize)]
struct LoadResponse {
    success: bool,
    data: Value,
}

async fn load_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<LoadResponse> {
    let store = state.store.clone();
    let data = blocking(move || Ok(store.load(&project_id)?)).await?;
    Ok(Json(LoadResponse {
        success: true,
        data,
    }))
}

#[derive(Debug, Serialize)]
struct ListResponse {
    success: bool,
    projects: Vec<ProjectSummary>,
}

async fn list_projects(State(state): State<AppState>) -> ApiResult<ListResponse> {
    let store = state.store.clone();
    let projects = blocking(move || Ok(store.list()?)).await?;
    Ok(Json(ListResponse {
        success: true,
        projects,
    }))
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let store = state.store.clone();
    let id = project_id.clone();
    blocking(move || Ok(store.delete(&id)?)).await?;

    info!(%project_id, "project deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "Project deleted successfully",
    }))
}

// =============================================================================
// Images
// =============================================================================

#[derive(Debug, Deserialize)]
struct ExportRequest {
    image: Option<String>,
    format: Option<String>,
    quality: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ExportResponse {
    success: bool,
    export_id: String,
    filename: String,
    path: String,
    message: &'static str,
}

async fn export_image(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ExportRequest>,
) -> ApiResult<ExportResponse> {
    let image = required(request.image).ok_or(ApiError::MissingParameters("Missing image data"))?;
    let format = request
        .format
        .unwrap_or_else(|| state.default_format.to_string());
    let quality = request
        .quality
        .map(Quality::from_request)
        .unwrap_or(state.default_quality);

    let exports = state.exports.clone();
    let exported = blocking(move || {
        let img = decode_data_url(&image)?;
        Ok(exports.export(&img, &format, quality)?)
    })
    .await?;

    info!(filename = %exported.filename, "image exported");
    Ok(Json(ExportResponse {
        success: true,
        export_id: exported.export_id,
        filename: exported.filename,
        path: exported.path,
        message: "Image exported successfully",
    }))
}

#[derive(Debug, Deserialize)]
struct FilterRequest {
    image: Option<String>,
    filter: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageResponse {
    success: bool,
    image: String,
}

async fn apply_filter(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<FilterRequest>,
) -> ApiResult<ImageResponse> {
    let (Some(image), Some(filter)) = (required(request.image), required(request.filter)) else {
        return Err(ApiError::MissingParameters("Missing parameters"));
    };

    let settings = state.images;
    let image = blocking(move || Ok(filter_data_url(&image, &filter, &settings)?)).await?;
    Ok(Json(ImageResponse {
        success: true,
        image,
    }))
}

#[derive(Debug, Deserialize)]
struct ResizeRequest {
    image: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    maintain_aspect: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ResizeResponse {
    success: bool,
    image: String,
    width: u32,
    height: u32,
}

async fn resize_image(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ResizeRequest>,
) -> ApiResult<ResizeResponse> {
    let (Some(image), Some(width), Some(height)) = (
        required(request.image),
        request.width.filter(|&w| w > 0),
        request.height.filter(|&h| h > 0),
    ) else {
        return Err(ApiError::MissingParameters("Missing parameters"));
    };
    let maintain_aspect = request.maintain_aspect.unwrap_or(true);

    let settings = state.images;
    let resized = blocking(move || {
        Ok(resize_data_url(
            &image,
            width,
            height,
            maintain_aspect,
            &settings,
        )?)
    })
    .await?;

    Ok(Json(ResizeResponse {
        success: true,
        image: resized.data_url,
        width: resized.width,
        height: resized.height,
    }))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Server is running",
    })
}
