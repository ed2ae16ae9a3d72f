use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::db::PrinterRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::octoprint::{
    FileListResponse, JobResponse, OctoPrintConnection, PrinterStateResponse,
};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:printer_id/status", get(printer_status))
        .route("/:printer_id/job", get(current_job))
        .route("/:printer_id/files", get(list_files))
        .route("/:printer_id/job/cancel", post(cancel_job))
}

async fn connection_for(
    state: &Arc<AppState>,
    user_id: &str,
    printer_id: &str,
) -> AppResult<OctoPrintConnection> {
    let printer = PrinterRepository::find_for_user(&state.db, user_id, printer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Printer not found".to_string()))?;
    OctoPrintConnection::for_printer(&printer)
}

// ============================================================================
// Handlers
// ============================================================================

/// Live printer state (temperatures, operational flags) from OctoPrint
async fn printer_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(printer_id): Path<String>,
) -> AppResult<Json<PrinterStateResponse>> {
    let conn = connection_for(&state, &user.id, &printer_id).await?;
    let status = state.octoprint.get_printer_state(&conn).await?;
    Ok(Json(status))
}

/// Current job and progress from OctoPrint
async fn current_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(printer_id): Path<String>,
) -> AppResult<Json<JobResponse>> {
    let conn = connection_for(&state, &user.id, &printer_id).await?;
    let job = state.octoprint.get_job(&conn).await?;
    Ok(Json(job))
}

/// Uploaded files on the OctoPrint instance
async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(printer_id): Path<String>,
) -> AppResult<Json<FileListResponse>> {
    let conn = connection_for(&state, &user.id, &printer_id).await?;
    let files = state.octoprint.list_files(&conn).await?;
    Ok(Json(files))
}

/// Cancel the active print job
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(printer_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = connection_for(&state, &user.id, &printer_id).await?;
    state.octoprint.cancel_job(&conn).await?;
    tracing::info!("Cancelled OctoPrint job for printer {}", printer_id);
    Ok(Json(serde_json::json!({ "ok": true })))
}
