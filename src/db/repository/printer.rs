use chrono::Utc;

use sqlx::Row;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::Printer;
use crate::error::{AppError, AppResult};

// ============================================================================
// Printer Repository
// ============================================================================

pub struct PrinterRepository;

fn row_to_printer(r: sqlx::sqlite::SqliteRow) -> Printer {
    Printer {
        id: r.get("id"),
        user_id: r.get("user_id"),
        name: r.get("name"),
        model: r.get("model"),
        octoprint_url: r.get("octoprint_url"),
        octoprint_api_key: r.get("octoprint_api_key"),
        notes: r.get("notes"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

const PRINTER_COLUMNS: &str = r#"
    id, user_id, name, model, octoprint_url, octoprint_api_key, notes,
    created_at, updated_at
"#;

impl PrinterRepository {
    pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Printer>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRINTER_COLUMNS} FROM printers WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(row_to_printer).collect())
    }

    pub async fn find_for_user(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<Printer>> {
        let row = sqlx::query(&format!(
            "SELECT {PRINTER_COLUMNS} FROM printers WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_printer))
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        name: &str,
        model: Option<&str>,
        octoprint_url: Option<&str>,
        octoprint_api_key: Option<&str>,
        notes: Option<&str>,
    ) -> AppResult<Printer> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO printers (
                id, user_id, name, model, octoprint_url, octoprint_api_key, notes,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {PRINTER_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(model)
        .bind(octoprint_url)
        .bind(octoprint_api_key)
        .bind(notes)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row_to_printer(row))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        name: &str,
        model: Option<&str>,
        octoprint_url: Option<&str>,
        octoprint_api_key: Option<&str>,
        notes: Option<&str>,
    ) -> AppResult<Option<Printer>> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            UPDATE printers
            SET name = ?, model = ?, octoprint_url = ?, octoprint_api_key = ?,
                notes = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {PRINTER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(model)
        .bind(octoprint_url)
        .bind(octoprint_api_key)
        .bind(notes)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_printer))
    }

    /// Update only the OctoPrint connection settings (settings screen).
    pub async fn update_octoprint_settings(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        octoprint_url: Option<&str>,
        octoprint_api_key: Option<&str>,
    ) -> AppResult<Option<Printer>> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query(&format!(
            r#"
            UPDATE printers
            SET octoprint_url = ?, octoprint_api_key = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING {PRINTER_COLUMNS}
            "#
        ))
        .bind(octoprint_url)
        .bind(octoprint_api_key)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.map(row_to_printer))
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM printers WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
