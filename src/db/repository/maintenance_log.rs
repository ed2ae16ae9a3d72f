use chrono::Utc;

use sqlx::Row;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::MaintenanceLog;
use crate::error::{AppError, AppResult};

// ============================================================================
// Maintenance Log Repository
// ============================================================================

pub struct MaintenanceLogRepository;

fn row_to_log(r: sqlx::sqlite::SqliteRow) -> MaintenanceLog {
    MaintenanceLog {
        id: r.get("id"),
        user_id: r.get("user_id"),
        printer_id: r.get("printer_id"),
        kind: r.get("type"),
        date: r.get("date"),
        notes: r.get("notes"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

const LOG_COLUMNS: &str = r#"
    id, user_id, printer_id, type, date, notes, created_at, updated_at
"#;

impl MaintenanceLogRepository {
    /// All maintenance logs for the user, newest date first.
    pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<MaintenanceLog>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM maintenance_logs WHERE user_id = ? ORDER BY date DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(row_to_log).collect())
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<MaintenanceLog>> {
        let row = sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM maintenance_logs WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_log))
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        printer_id: &str,
        kind: &str,
        date: &str,
        notes: Option<&str>,
    ) -> AppResult<MaintenanceLog> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO maintenance_logs (
                id, user_id, printer_id, type, date, notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(user_id)
        .bind(printer_id)
        .bind(kind)
        .bind(date)
        .bind(notes)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row_to_log(row))
    }

    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        printer_id: &str,
        kind: &str,
        date: &str,
        notes: Option<&str>,
    ) -> AppResult<Option<MaintenanceLog>> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            UPDATE maintenance_logs
            SET printer_id = ?, type = ?, date = ?, notes = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(printer_id)
        .bind(kind)
        .bind(date)
        .bind(notes)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_log))
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM maintenance_logs WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
