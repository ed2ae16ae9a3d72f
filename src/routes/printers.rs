use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::{models::Printer, PrinterRepository};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_printers).post(create_printer))
        .route(
            "/:id",
            get(get_printer).put(update_printer).delete(delete_printer),
        )
        .route("/:id/octoprint-settings", axum::routing::put(update_octoprint_settings))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PrinterRequest {
    pub name: String,
    pub model: Option<String>,
    pub octoprint_url: Option<String>,
    pub octoprint_api_key: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OctoPrintSettingsRequest {
    pub octoprint_url: Option<String>,
    pub octoprint_api_key: Option<String>,
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_printers(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Printer>>> {
    let printers = PrinterRepository::list_for_user(&state.db, &user.id).await?;
    Ok(Json(printers))
}

async fn get_printer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Printer>> {
    let printer = PrinterRepository::find_for_user(&state.db, &user.id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Printer not found".to_string()))?;
    Ok(Json(printer))
}

async fn create_printer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<PrinterRequest>,
) -> AppResult<Json<Printer>> {
    validate_name(&request.name)?;

    let printer = PrinterRepository::create(
        &state.db,
        &user.id,
        request.name.trim(),
        request.model.as_deref(),
        request.octoprint_url.as_deref(),
        request.octoprint_api_key.as_deref(),
        request.notes.as_deref(),
    )
    .await?;

    Ok(Json(printer))
}

async fn update_printer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<PrinterRequest>,
) -> AppResult<Json<Printer>> {
    validate_name(&request.name)?;

    let printer = PrinterRepository::update(
        &state.db,
        &user.id,
        &id,
        request.name.trim(),
        request.model.as_deref(),
        request.octoprint_url.as_deref(),
        request.octoprint_api_key.as_deref(),
        request.notes.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Printer not found".to_string()))?;

    Ok(Json(printer))
}

/// Update only the OctoPrint connection settings (settings screen parity).
async fn update_octoprint_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<OctoPrintSettingsRequest>,
) -> AppResult<Json<Printer>> {
    let printer = PrinterRepository::update_octoprint_settings(
        &state.db,
        &user.id,
        &id,
        request.octoprint_url.as_deref(),
        request.octoprint_api_key.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Printer not found".to_string()))?;

    Ok(Json(printer))
}

async fn delete_printer(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = PrinterRepository::delete(&state.db, &user.id, &id).await?;
    if !deleted {
        return Err(AppError::NotFound("Printer not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}
