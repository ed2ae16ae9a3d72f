use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A logged print. `start_time`/`end_time` are stored as ISO-8601 strings as
/// supplied by forms or OctoPrint; the maintenance calculator tolerates
/// missing or malformed values, so they are not parsed at the storage layer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,
    pub user_id: String,
    pub printer_id: String,
    pub name: String,
    pub material: Option<String>,
    pub grams_used: Option<f64>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub const JOB_STATUSES: &[&str] = &["Success", "Failed", "In Progress"];

pub const SOURCE_MANUAL: &str = "manual";
pub const SOURCE_OCTOPRINT: &str = "octoprint";
