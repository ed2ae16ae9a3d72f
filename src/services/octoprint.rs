use std::collections::HashMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::db::models::Printer;
use crate::error::{AppError, AppResult};

/// Client for users' self-hosted OctoPrint instances. Each printer carries
/// its own base URL and API key; the client itself only holds the shared
/// reqwest connection pool.
#[derive(Debug, Clone)]
pub struct OctoPrintClient {
    client: Client,
}

/// Connection settings taken from a printer record.
#[derive(Debug, Clone)]
pub struct OctoPrintConnection {
    pub base_url: String,
    pub api_key: String,
}

impl OctoPrintConnection {
    /// Extract the OctoPrint connection from a printer, failing when the
    /// integration is not configured.
    pub fn for_printer(printer: &Printer) -> AppResult<Self> {
        let (url, api_key) = match (&printer.octoprint_url, &printer.octoprint_api_key) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                (url.trim(), key.trim())
            }
            _ => {
                return Err(AppError::BadRequest(
                    "OctoPrint is not configured for this printer".to_string(),
                ))
            }
        };

        // Validate early so a bad URL surfaces as a 400, not a transport error
        Url::parse(url).map_err(|e| {
            AppError::BadRequest(format!("Invalid OctoPrint URL for this printer: {}", e))
        })?;

        Ok(OctoPrintConnection {
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

// ============================================================================
// OctoPrint API Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrinterStateResponse {
    pub state: PrinterStateInfo,
    #[serde(default)]
    pub temperature: HashMap<String, TemperatureReading>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrinterStateInfo {
    pub text: String,
    #[serde(default)]
    pub flags: PrinterStateFlags,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PrinterStateFlags {
    #[serde(default)]
    pub operational: bool,
    #[serde(default)]
    pub printing: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub ready: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemperatureReading {
    pub actual: Option<f64>,
    pub target: Option<f64>,
    pub offset: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobResponse {
    pub job: JobInfo,
    pub progress: JobProgress,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobInfo {
    pub file: Option<JobFile>,
    #[serde(rename = "estimatedPrintTime")]
    pub estimated_print_time: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobFile {
    pub name: Option<String>,
    pub size: Option<u64>,
    pub date: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobProgress {
    pub completion: Option<f64>,
    #[serde(rename = "printTime")]
    pub print_time: Option<f64>,
    #[serde(rename = "printTimeLeft")]
    pub print_time_left: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileEntry {
    pub name: Option<String>,
    pub display: Option<String>,
    pub size: Option<u64>,
    pub date: Option<i64>,
}

#[derive(Debug, Serialize)]
struct JobCommandRequest<'a> {
    command: &'a str,
}

impl OctoPrintClient {
    pub fn new(request_timeout_seconds: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(request_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self { client })
    }

    /// Current printer state (`/api/printer`): state text/flags and
    /// tool/bed temperatures.
    pub async fn get_printer_state(
        &self,
        conn: &OctoPrintConnection,
    ) -> AppResult<PrinterStateResponse> {
        let url = conn.endpoint("api/printer");
        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &conn.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::OctoPrintApi(format!(
                "Failed to fetch printer state ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<PrinterStateResponse>()
            .await
            .map_err(|e| AppError::OctoPrintApi(format!("Failed to parse printer state: {}", e)))
    }

    /// Current job (`/api/job`): file, progress and job state.
    pub async fn get_job(&self, conn: &OctoPrintConnection) -> AppResult<JobResponse> {
        let url = conn.endpoint("api/job");
        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &conn.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::OctoPrintApi(format!(
                "Failed to fetch job information ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<JobResponse>()
            .await
            .map_err(|e| AppError::OctoPrintApi(format!("Failed to parse job information: {}", e)))
    }

    /// Uploaded files (`/api/files`).
    pub async fn list_files(&self, conn: &OctoPrintConnection) -> AppResult<FileListResponse> {
        let url = conn.endpoint("api/files");
        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &conn.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::OctoPrintApi(format!(
                "Failed to list files ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<FileListResponse>()
            .await
            .map_err(|e| AppError::OctoPrintApi(format!("Failed to parse file list: {}", e)))
    }

    /// Cancel the active job (`POST /api/job` with `{"command": "cancel"}`).
    /// OctoPrint answers 409 when no job is active.
    pub async fn cancel_job(&self, conn: &OctoPrintConnection) -> AppResult<()> {
        let url = conn.endpoint("api/job");
        let response = self
            .client
            .post(url)
            .header("X-Api-Key", &conn.api_key)
            .json(&JobCommandRequest { command: "cancel" })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::OctoPrintApi(format!(
                "Failed to cancel job ({}): {}",
                status, error_text
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn printer(url: Option<&str>, key: Option<&str>) -> Printer {
        let stamp: NaiveDateTime = "2024-03-01T00:00:00"
            .parse()
            .unwrap_or_else(|_| NaiveDateTime::default());
        Printer {
            id: "P1".to_string(),
            user_id: "u1".to_string(),
            name: "Prusa".to_string(),
            model: None,
            octoprint_url: url.map(str::to_string),
            octoprint_api_key: key.map(str::to_string),
            notes: None,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    #[test]
    fn connection_requires_url_and_key() {
        assert!(OctoPrintConnection::for_printer(&printer(None, None)).is_err());
        assert!(
            OctoPrintConnection::for_printer(&printer(Some("http://octoprint.local"), None))
                .is_err()
        );
        assert!(OctoPrintConnection::for_printer(&printer(Some("  "), Some("key"))).is_err());
        assert!(OctoPrintConnection::for_printer(&printer(Some("not a url"), Some("key"))).is_err());
    }

    #[test]
    fn endpoint_joins_without_duplicate_slashes() {
        let conn =
            OctoPrintConnection::for_printer(&printer(Some("http://octoprint.local/"), Some("key")))
                .unwrap();
        assert_eq!(
            conn.endpoint("api/printer"),
            "http://octoprint.local/api/printer"
        );
    }
}
