use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A record that maintenance of `kind` was performed on a printer at `date`
/// (ISO-8601 instant). The date is server-assigned on creation and may be
/// corrected by the owner afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MaintenanceLog {
    pub id: String,
    pub user_id: String,
    pub printer_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub date: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fixed catalog of maintenance types.
pub const MAINTENANCE_TYPES: &[&str] = &[
    "Nozzle Clean",
    "Bed Level",
    "Lubrication",
    "Firmware Update",
    "General Inspection",
    "Other",
];
