use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{
    models::{MaintenanceInterval, MaintenanceLog, MAINTENANCE_TYPES},
    MaintenanceIntervalRepository, MaintenanceLogRepository, PrintJobRepository,
    PrinterRepository,
};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::maintenance::{self, DueStatus};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logs", get(list_logs).post(create_log))
        .route("/logs/:id", axum::routing::put(update_log).delete(delete_log))
        .route("/intervals", get(list_intervals).post(create_interval))
        .route(
            "/intervals/:id",
            axum::routing::put(update_interval).delete(delete_interval),
        )
        .route("/intervals/:id/log-now", post(log_now))
        .route("/due", get(due_report))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MaintenanceLogRequest {
    pub printer_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Only honored on update; creation stamps the log with the current time.
    pub date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateIntervalRequest {
    pub printer_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub interval_prints: Option<i64>,
    pub interval_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateIntervalRequest {
    pub interval_prints: Option<i64>,
    pub interval_hours: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DueEntry {
    pub interval_id: String,
    pub printer_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: DueStatus,
    pub jobs_since: u32,
    pub hours_since: f64,
    pub prints_remaining: Option<i64>,
    pub hours_remaining: Option<f64>,
}

fn validate_kind(kind: &str) -> AppResult<()> {
    if !MAINTENANCE_TYPES.contains(&kind) {
        return Err(AppError::Validation(format!(
            "Unknown maintenance type: {}",
            kind
        )));
    }
    Ok(())
}

/// Thresholds must be positive where present. An interval with neither
/// threshold is accepted and simply never comes due; an unset threshold is
/// stored as NULL, never as zero.
fn validate_thresholds(prints: Option<i64>, hours: Option<f64>) -> AppResult<()> {
    if let Some(prints) = prints {
        if prints < 1 {
            return Err(AppError::Validation(
                "interval_prints must be a positive integer".to_string(),
            ));
        }
    }
    if let Some(hours) = hours {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(AppError::Validation(
                "interval_hours must be a positive number".to_string(),
            ));
        }
    }
    Ok(())
}

async fn ensure_printer_owned(
    state: &Arc<AppState>,
    user_id: &str,
    printer_id: &str,
) -> AppResult<()> {
    PrinterRepository::find_for_user(&state.db, user_id, printer_id)
        .await?
        .ok_or_else(|| AppError::Validation("Unknown printer".to_string()))?;
    Ok(())
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Maintenance Log Handlers
// ============================================================================

async fn list_logs(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<MaintenanceLog>>> {
    let logs = MaintenanceLogRepository::list_for_user(&state.db, &user.id).await?;
    Ok(Json(logs))
}

async fn create_log(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<MaintenanceLogRequest>,
) -> AppResult<Json<MaintenanceLog>> {
    validate_kind(&request.kind)?;
    ensure_printer_owned(&state, &user.id, &request.printer_id).await?;

    let log = MaintenanceLogRepository::create(
        &state.db,
        &user.id,
        &request.printer_id,
        &request.kind,
        &now_iso(),
        request.notes.as_deref(),
    )
    .await?;

    Ok(Json(log))
}

async fn update_log(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<MaintenanceLogRequest>,
) -> AppResult<Json<MaintenanceLog>> {
    validate_kind(&request.kind)?;
    ensure_printer_owned(&state, &user.id, &request.printer_id).await?;

    // Owners may correct the date; without one the update re-stamps to now,
    // matching the original edit form.
    let date = request.date.unwrap_or_else(now_iso);

    let log = MaintenanceLogRepository::update(
        &state.db,
        &user.id,
        &id,
        &request.printer_id,
        &request.kind,
        &date,
        request.notes.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Maintenance log not found".to_string()))?;

    Ok(Json(log))
}

async fn delete_log(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = MaintenanceLogRepository::delete(&state.db, &user.id, &id).await?;
    if !deleted {
        return Err(AppError::NotFound("Maintenance log not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ============================================================================
// Maintenance Interval Handlers
// ============================================================================

async fn list_intervals(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<MaintenanceInterval>>> {
    let intervals = MaintenanceIntervalRepository::list_for_user(&state.db, &user.id).await?;
    Ok(Json(intervals))
}

async fn create_interval(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateIntervalRequest>,
) -> AppResult<Json<MaintenanceInterval>> {
    validate_kind(&request.kind)?;
    validate_thresholds(request.interval_prints, request.interval_hours)?;
    ensure_printer_owned(&state, &user.id, &request.printer_id).await?;

    // One active interval per (printer, type)
    if MaintenanceIntervalRepository::find_by_printer_and_type(
        &state.db,
        &user.id,
        &request.printer_id,
        &request.kind,
    )
    .await?
    .is_some()
    {
        return Err(AppError::Conflict(
            "An interval for this printer and type already exists".to_string(),
        ));
    }

    let interval = MaintenanceIntervalRepository::create(
        &state.db,
        &user.id,
        &request.printer_id,
        &request.kind,
        request.interval_prints,
        request.interval_hours,
    )
    .await?;

    Ok(Json(interval))
}

async fn update_interval(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateIntervalRequest>,
) -> AppResult<Json<MaintenanceInterval>> {
    validate_thresholds(request.interval_prints, request.interval_hours)?;

    let interval = MaintenanceIntervalRepository::update(
        &state.db,
        &user.id,
        &id,
        request.interval_prints,
        request.interval_hours,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Maintenance interval not found".to_string()))?;

    Ok(Json(interval))
}

async fn delete_interval(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = MaintenanceIntervalRepository::delete(&state.db, &user.id, &id).await?;
    if !deleted {
        return Err(AppError::NotFound(
            "Maintenance interval not found".to_string(),
        ));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// "Update Now": record a maintenance log for the interval's printer/type
/// dated now, resetting its baseline.
async fn log_now(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MaintenanceLog>> {
    let interval = MaintenanceIntervalRepository::find_for_user(&state.db, &user.id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Maintenance interval not found".to_string()))?;

    let log = MaintenanceLogRepository::create(
        &state.db,
        &user.id,
        &interval.printer_id,
        &interval.kind,
        &now_iso(),
        None,
    )
    .await?;

    Ok(Json(log))
}

// ============================================================================
// Due Report
// ============================================================================

/// Evaluate every interval against one consistent snapshot of the user's
/// logs and jobs, ranked most urgent first.
async fn due_report(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<DueEntry>>> {
    let intervals = MaintenanceIntervalRepository::list_for_user(&state.db, &user.id).await?;
    let logs = MaintenanceLogRepository::list_for_user(&state.db, &user.id).await?;
    let jobs = PrintJobRepository::list_for_user(&state.db, &user.id).await?;

    let mut reports: Vec<_> = intervals
        .iter()
        .map(|interval| maintenance::evaluate(interval, &logs, &jobs))
        .collect();
    maintenance::rank_by_urgency(&mut reports);

    let entries = reports
        .into_iter()
        .map(|report| DueEntry {
            interval_id: report.interval_id,
            printer_id: report.printer_id,
            kind: report.kind,
            status: report.status,
            jobs_since: report.jobs_since,
            hours_since: round2(report.hours_since),
            prints_remaining: report.prints_remaining,
            hours_remaining: report.hours_remaining.map(round1),
        })
        .collect();

    Ok(Json(entries))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
