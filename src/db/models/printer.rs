use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Printer {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub model: Option<String>,

    // OctoPrint connection settings, managed from the settings screen
    pub octoprint_url: Option<String>,
    pub octoprint_api_key: Option<String>,

    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
