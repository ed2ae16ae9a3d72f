use chrono::Utc;

use sqlx::Row;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::PrintJob;
use crate::error::{AppError, AppResult};

// ============================================================================
// Print Job Repository
// ============================================================================

pub struct PrintJobRepository;

fn row_to_job(r: sqlx::sqlite::SqliteRow) -> PrintJob {
    PrintJob {
        id: r.get("id"),
        user_id: r.get("user_id"),
        printer_id: r.get("printer_id"),
        name: r.get("name"),
        material: r.get("material"),
        grams_used: r.get("grams_used"),
        status: r.get("status"),
        start_time: r.get("start_time"),
        end_time: r.get("end_time"),
        source: r.get("source"),
        notes: r.get("notes"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

const JOB_COLUMNS: &str = r#"
    id, user_id, printer_id, name, material, grams_used, status,
    start_time, end_time, source, notes, created_at, updated_at
"#;

/// Editable fields of a print job, shared by create and update.
#[derive(Debug, Clone)]
pub struct PrintJobRecord {
    pub printer_id: String,
    pub name: String,
    pub material: Option<String>,
    pub grams_used: Option<f64>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

impl PrintJobRepository {
    /// All jobs for the user, newest start time first.
    pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<PrintJob>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs WHERE user_id = ? ORDER BY start_time DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(row_to_job).collect())
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<PrintJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_job))
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        record: &PrintJobRecord,
    ) -> AppResult<PrintJob> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO print_jobs (
                id, user_id, printer_id, name, material, grams_used, status,
                start_time, end_time, source, notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(user_id)
        .bind(&record.printer_id)
        .bind(&record.name)
        .bind(&record.material)
        .bind(record.grams_used)
        .bind(&record.status)
        .bind(&record.start_time)
        .bind(&record.end_time)
        .bind(&record.source)
        .bind(&record.notes)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row_to_job(row))
    }

    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        record: &PrintJobRecord,
    ) -> AppResult<Option<PrintJob>> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            UPDATE print_jobs
            SET printer_id = ?, name = ?, material = ?, grams_used = ?, status = ?,
                start_time = ?, end_time = ?, source = ?, notes = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(&record.printer_id)
        .bind(&record.name)
        .bind(&record.material)
        .bind(record.grams_used)
        .bind(&record.status)
        .bind(&record.start_time)
        .bind(&record.end_time)
        .bind(&record.source)
        .bind(&record.notes)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_job))
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM print_jobs WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
