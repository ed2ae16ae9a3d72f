use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{Duration, SecondsFormat, Utc};
use serde::Deserialize;

use crate::db::{
    models::{PrintJob, JOB_STATUSES, SOURCE_MANUAL, SOURCE_OCTOPRINT},
    PrintJobRecord, PrintJobRepository, PrinterRepository,
};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/:id", get(get_job).put(update_job).delete(delete_job))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Job form payload. Either explicit start/end instants, or a duration
/// (`hours`/`minutes`) from which start/end are derived backwards from now,
/// mirroring the quick-entry form.
#[derive(Debug, Deserialize)]
pub struct PrintJobRequest {
    pub printer_id: String,
    pub name: String,
    pub material: Option<String>,
    pub grams_used: Option<f64>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub hours: Option<i64>,
    pub minutes: Option<i64>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

impl PrintJobRequest {
    /// Validate the payload and resolve it into storable fields.
    async fn into_record(self, state: &Arc<AppState>, user_id: &str) -> AppResult<PrintJobRecord> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Job name is required".to_string()));
        }

        if let Some(status) = self.status.as_deref() {
            if !JOB_STATUSES.contains(&status) {
                return Err(AppError::Validation(format!(
                    "Unknown job status: {}",
                    status
                )));
            }
        }

        if let Some(source) = self.source.as_deref() {
            if source != SOURCE_MANUAL && source != SOURCE_OCTOPRINT {
                return Err(AppError::Validation(format!(
                    "Unknown job source: {}",
                    source
                )));
            }
        }

        if let Some(grams) = self.grams_used {
            if grams < 0.0 {
                return Err(AppError::Validation(
                    "Grams used cannot be negative".to_string(),
                ));
            }
        }

        // The printer must belong to the requesting user
        PrinterRepository::find_for_user(&state.db, user_id, &self.printer_id)
            .await?
            .ok_or_else(|| AppError::Validation("Unknown printer".to_string()))?;

        let derive_from_duration = self.start_time.is_none()
            && self.end_time.is_none()
            && (self.hours.is_some() || self.minutes.is_some());

        let (start_time, end_time) = if derive_from_duration {
            let minutes = self.hours.unwrap_or(0) * 60 + self.minutes.unwrap_or(0);
            if minutes < 0 {
                return Err(AppError::Validation(
                    "Duration cannot be negative".to_string(),
                ));
            }
            let end = Utc::now();
            let start = end - Duration::minutes(minutes);
            (
                Some(start.to_rfc3339_opts(SecondsFormat::Millis, true)),
                Some(end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            )
        } else {
            (self.start_time, self.end_time)
        };

        Ok(PrintJobRecord {
            printer_id: self.printer_id,
            name: self.name.trim().to_string(),
            material: self.material,
            grams_used: self.grams_used,
            status: self.status,
            start_time,
            end_time,
            source: Some(self.source.unwrap_or_else(|| SOURCE_MANUAL.to_string())),
            notes: self.notes,
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_jobs(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<PrintJob>>> {
    let jobs = PrintJobRepository::list_for_user(&state.db, &user.id).await?;
    Ok(Json(jobs))
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<PrintJob>> {
    let job = PrintJobRepository::find_for_user(&state.db, &user.id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Print job not found".to_string()))?;
    Ok(Json(job))
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<PrintJobRequest>,
) -> AppResult<Json<PrintJob>> {
    let record = request.into_record(&state, &user.id).await?;
    let job = PrintJobRepository::create(&state.db, &user.id, &record).await?;
    Ok(Json(job))
}

async fn update_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<PrintJobRequest>,
) -> AppResult<Json<PrintJob>> {
    let record = request.into_record(&state, &user.id).await?;
    let job = PrintJobRepository::update(&state.db, &user.id, &id, &record)
        .await?
        .ok_or_else(|| AppError::NotFound("Print job not found".to_string()))?;
    Ok(Json(job))
}

async fn delete_job(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = PrintJobRepository::delete(&state.db, &user.id, &id).await?;
    if !deleted {
        return Err(AppError::NotFound("Print job not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}
