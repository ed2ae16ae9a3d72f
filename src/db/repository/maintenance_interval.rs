use chrono::Utc;

use sqlx::Row;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::MaintenanceInterval;
use crate::error::{AppError, AppResult};

// ============================================================================
// Maintenance Interval Repository
// ============================================================================

pub struct MaintenanceIntervalRepository;

fn row_to_interval(r: sqlx::sqlite::SqliteRow) -> MaintenanceInterval {
    MaintenanceInterval {
        id: r.get("id"),
        user_id: r.get("user_id"),
        printer_id: r.get("printer_id"),
        kind: r.get("type"),
        interval_prints: r.get("interval_prints"),
        interval_hours: r.get("interval_hours"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

const INTERVAL_COLUMNS: &str = r#"
    id, user_id, printer_id, type, interval_prints, interval_hours,
    created_at, updated_at
"#;

impl MaintenanceIntervalRepository {
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: &str,
    ) -> AppResult<Vec<MaintenanceInterval>> {
        let rows = sqlx::query(&format!(
            "SELECT {INTERVAL_COLUMNS} FROM maintenance_intervals WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(row_to_interval).collect())
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<MaintenanceInterval>> {
        let row = sqlx::query(&format!(
            "SELECT {INTERVAL_COLUMNS} FROM maintenance_intervals WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_interval))
    }

    /// One active interval per (printer, type); used to reject duplicates
    /// before insert with a clean conflict error.
    pub async fn find_by_printer_and_type(
        pool: &SqlitePool,
        user_id: &str,
        printer_id: &str,
        kind: &str,
    ) -> AppResult<Option<MaintenanceInterval>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {INTERVAL_COLUMNS} FROM maintenance_intervals
            WHERE user_id = ? AND printer_id = ? AND type = ?
            "#
        ))
        .bind(user_id)
        .bind(printer_id)
        .bind(kind)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_interval))
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        printer_id: &str,
        kind: &str,
        interval_prints: Option<i64>,
        interval_hours: Option<f64>,
    ) -> AppResult<MaintenanceInterval> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO maintenance_intervals (
                id, user_id, printer_id, type, interval_prints, interval_hours,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {INTERVAL_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(user_id)
        .bind(printer_id)
        .bind(kind)
        .bind(interval_prints)
        .bind(interval_hours)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row_to_interval(row))
    }

    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        interval_prints: Option<i64>,
        interval_hours: Option<f64>,
    ) -> AppResult<Option<MaintenanceInterval>> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            UPDATE maintenance_intervals
            SET interval_prints = ?, interval_hours = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {INTERVAL_COLUMNS}
            "#
        ))
        .bind(interval_prints)
        .bind(interval_hours)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_interval))
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM maintenance_intervals WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
