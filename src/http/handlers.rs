use super::state::AppState;
use crate::error::CaptureError;
use crate::session::CaptureMode;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub mode: CaptureMode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    /// Also remove the recording from disk
    #[serde(default)]
    pub delete_file: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: CaptureError,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub error: String,
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        let status = match &self {
            CaptureError::AlreadyActive(_) | CaptureError::NotActive(_) => StatusCode::CONFLICT,
            CaptureError::NoSegments => StatusCode::UNPROCESSABLE_ENTITY,
            CaptureError::Spawn(_) | CaptureError::Concat(_) | CaptureError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse { error: self })).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /status
/// Current mode, active session and capabilities
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let controller = state.controller.lock().await;
    (StatusCode::OK, Json(controller.status()))
}

/// GET /recordings
/// Catalogued recordings, newest first
pub async fn list_recordings(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list().await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => {
            error!("Failed to list recordings: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    error: format!("Failed to list recordings: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /recordings/:id
pub async fn get_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.catalog.get(&id).await {
        Ok(Some(entry)) => (StatusCode::OK, Json(entry)).into_response(),
        Ok(None) => recording_not_found(&id),
        Err(e) => catalog_failure("read", &id, e),
    }
}

/// DELETE /recordings/:id?delete_file=true
/// Forget a recording, optionally removing its file
pub async fn delete_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> impl IntoResponse {
    match state.catalog.delete(&id, query.delete_file).await {
        Ok(true) => {
            info!(delete_file = query.delete_file, "Recording {} deleted via HTTP", id);
            (StatusCode::OK, Json(DeletedResponse { id, deleted: true })).into_response()
        }
        Ok(false) => recording_not_found(&id),
        Err(e) => catalog_failure("delete", &id, e),
    }
}

fn recording_not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse {
            error: format!("No recording with id {}", id),
        }),
    )
        .into_response()
}

fn catalog_failure(action: &str, id: &str, e: anyhow::Error) -> Response {
    error!("Failed to {} recording {}: {:#}", action, id, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MessageResponse {
            error: format!("Failed to {} recording {}: {}", action, id, e),
        }),
    )
        .into_response()
}

/// POST /fulltime/start
pub async fn start_fulltime(
    State(state): State<AppState>,
) -> Result<Json<StartResponse>, CaptureError> {
    let mut controller = state.controller.lock().await;
    controller.start_fulltime().await?;

    info!("Fulltime recording started via HTTP");

    Ok(Json(StartResponse {
        mode: controller.mode(),
        message: "Recording started".to_string(),
    }))
}

/// POST /fulltime/stop
/// Stop the fulltime recording and return the file
pub async fn stop_fulltime(State(state): State<AppState>) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;

    match controller.stop_fulltime().await {
        Some(path) => (StatusCode::OK, Json(SavedResponse { path })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse {
                error: "No recording was produced".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /buffer/start
pub async fn start_buffer(
    State(state): State<AppState>,
) -> Result<Json<StartResponse>, CaptureError> {
    let mut controller = state.controller.lock().await;
    controller.start_buffer().await?;

    info!("Replay buffer started via HTTP");

    Ok(Json(StartResponse {
        mode: controller.mode(),
        message: format!(
            "Buffering the last {} seconds",
            controller.settings().buffer_duration_seconds()
        ),
    }))
}

/// POST /buffer/save
/// Join the buffered segments into a replay file
pub async fn save_buffer(
    State(state): State<AppState>,
) -> Result<Json<SavedResponse>, CaptureError> {
    let mut controller = state.controller.lock().await;
    let path = controller.save_buffer().await?;
    Ok(Json(SavedResponse { path }))
}

/// POST /buffer/cancel
pub async fn cancel_buffer(State(state): State<AppState>) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    let cancelled = controller.cancel_buffer().await;
    (StatusCode::OK, Json(CancelResponse { cancelled }))
}
