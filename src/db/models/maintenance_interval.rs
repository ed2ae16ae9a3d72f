use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Configured maintenance cadence for one (printer, type) pair.
///
/// Thresholds are genuinely optional and must never be defaulted to zero: an
/// unset threshold means "not evaluated on this axis", while a zero prints
/// threshold would read as perpetually overdue.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MaintenanceInterval {
    pub id: String,
    pub user_id: String,
    pub printer_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub interval_prints: Option<i64>,
    pub interval_hours: Option<f64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
