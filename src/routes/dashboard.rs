use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{
    models::{MaintenanceInterval, MaintenanceLog, PrintJob, Printer, SOURCE_OCTOPRINT},
    MaintenanceIntervalRepository, MaintenanceLogRepository, PrintJobRepository,
    PrinterRepository,
};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::services::maintenance::{self, DueStatus};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(stats))
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub grams_by_material: Vec<MaterialUsage>,
    pub average_print_minutes: f64,
    pub print_minutes_by_day: Vec<DailyPrintTime>,
    pub maintenance_by_type: Vec<MaintenanceCount>,
    pub job_sources: JobSourceCounts,
    pub printer_statuses: Vec<PrinterStatusEntry>,
}

#[derive(Debug, Serialize)]
pub struct MaterialUsage {
    pub material: String,
    pub grams: f64,
}

#[derive(Debug, Serialize)]
pub struct DailyPrintTime {
    pub day: String,
    pub minutes: f64,
}

#[derive(Debug, Serialize)]
pub struct MaintenanceCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u32,
}

#[derive(Debug, Serialize)]
pub struct JobSourceCounts {
    pub manual: u32,
    pub octoprint: u32,
}

#[derive(Debug, Serialize)]
pub struct PrinterStatusEntry {
    pub printer_id: String,
    pub name: String,
    pub status: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Aggregated dashboard figures computed over one snapshot of the user's data.
async fn stats(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<DashboardStats>> {
    let printers = PrinterRepository::list_for_user(&state.db, &user.id).await?;
    let jobs = PrintJobRepository::list_for_user(&state.db, &user.id).await?;
    let logs = MaintenanceLogRepository::list_for_user(&state.db, &user.id).await?;
    let intervals = MaintenanceIntervalRepository::list_for_user(&state.db, &user.id).await?;

    Ok(Json(build_stats(&printers, &jobs, &logs, &intervals)))
}

fn build_stats(
    printers: &[Printer],
    jobs: &[PrintJob],
    logs: &[MaintenanceLog],
    intervals: &[MaintenanceInterval],
) -> DashboardStats {
    // Total grams used by material
    let mut grams: BTreeMap<String, f64> = BTreeMap::new();
    for job in jobs {
        let material = job.material.clone().unwrap_or_else(|| "Unknown".to_string());
        *grams.entry(material).or_insert(0.0) += job.grams_used.unwrap_or(0.0);
    }
    let grams_by_material = grams
        .into_iter()
        .map(|(material, grams)| MaterialUsage { material, grams })
        .collect();

    // Average print time over jobs with a usable duration
    let durations: Vec<f64> = jobs
        .iter()
        .map(|job| maintenance::job_duration_hours(job) * 60.0)
        .filter(|minutes| *minutes > 0.0)
        .collect();
    let average_print_minutes = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    };

    // Print minutes bucketed by start day
    let mut by_day: BTreeMap<String, f64> = BTreeMap::new();
    for job in jobs {
        let minutes = maintenance::job_duration_hours(job) * 60.0;
        if minutes <= 0.0 {
            continue;
        }
        let day = job
            .start_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d").to_string());
        if let Some(day) = day {
            *by_day.entry(day).or_insert(0.0) += minutes;
        }
    }
    let print_minutes_by_day = by_day
        .into_iter()
        .map(|(day, minutes)| DailyPrintTime { day, minutes })
        .collect();

    // Maintenance events by type
    let mut by_type: BTreeMap<String, u32> = BTreeMap::new();
    for log in logs {
        *by_type.entry(log.kind.clone()).or_insert(0) += 1;
    }
    let maintenance_by_type = by_type
        .into_iter()
        .map(|(kind, count)| MaintenanceCount { kind, count })
        .collect();

    // Manual vs OctoPrint-sourced jobs
    let octoprint = jobs
        .iter()
        .filter(|job| job.source.as_deref() == Some(SOURCE_OCTOPRINT))
        .count() as u32;
    let job_sources = JobSourceCounts {
        manual: jobs.len() as u32 - octoprint,
        octoprint,
    };

    // Per-printer headline status: overdue on any interval means due
    let printer_statuses = printers
        .iter()
        .map(|printer| {
            let overdue = intervals
                .iter()
                .filter(|interval| interval.printer_id == printer.id)
                .any(|interval| {
                    maintenance::evaluate(interval, logs, jobs).status == DueStatus::Overdue
                });
            PrinterStatusEntry {
                printer_id: printer.id.clone(),
                name: printer.name.clone(),
                status: if overdue { "Maintenance Due" } else { "OK" }.to_string(),
            }
        })
        .collect();

    DashboardStats {
        grams_by_material,
        average_print_minutes,
        print_minutes_by_day,
        maintenance_by_type,
        job_sources,
        printer_statuses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn stamp() -> NaiveDateTime {
        "2024-03-01T00:00:00"
            .parse()
            .unwrap_or_else(|_| NaiveDateTime::default())
    }

    fn printer(id: &str, name: &str) -> Printer {
        Printer {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: name.to_string(),
            model: None,
            octoprint_url: None,
            octoprint_api_key: None,
            notes: None,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    fn job(
        id: &str,
        printer_id: &str,
        material: Option<&str>,
        grams: Option<f64>,
        start: &str,
        end: &str,
        source: Option<&str>,
    ) -> PrintJob {
        PrintJob {
            id: id.to_string(),
            user_id: "u1".to_string(),
            printer_id: printer_id.to_string(),
            name: format!("job {}", id),
            material: material.map(str::to_string),
            grams_used: grams,
            status: Some("Success".to_string()),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            source: source.map(str::to_string),
            notes: None,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    #[test]
    fn grams_grouped_by_material_with_unknown_bucket() {
        let jobs = vec![
            job(
                "j1",
                "P1",
                Some("PLA"),
                Some(12.0),
                "2024-01-01T00:00:00Z",
                "2024-01-01T01:00:00Z",
                None,
            ),
            job(
                "j2",
                "P1",
                Some("PLA"),
                Some(8.0),
                "2024-01-02T00:00:00Z",
                "2024-01-02T01:00:00Z",
                None,
            ),
            job(
                "j3",
                "P1",
                None,
                Some(5.0),
                "2024-01-03T00:00:00Z",
                "2024-01-03T01:00:00Z",
                None,
            ),
        ];

        let stats = build_stats(&[], &jobs, &[], &[]);
        let pla = stats
            .grams_by_material
            .iter()
            .find(|m| m.material == "PLA")
            .map(|m| m.grams);
        let unknown = stats
            .grams_by_material
            .iter()
            .find(|m| m.material == "Unknown")
            .map(|m| m.grams);
        assert_eq!(pla, Some(20.0));
        assert_eq!(unknown, Some(5.0));
    }

    #[test]
    fn average_ignores_jobs_without_duration() {
        let mut jobs = vec![
            job(
                "j1",
                "P1",
                None,
                None,
                "2024-01-01T00:00:00Z",
                "2024-01-01T01:00:00Z",
                None,
            ),
            job(
                "j2",
                "P1",
                None,
                None,
                "2024-01-02T00:00:00Z",
                "2024-01-02T03:00:00Z",
                None,
            ),
        ];
        // Unusable timestamps contribute nothing to the average
        jobs.push(PrintJob {
            start_time: None,
            end_time: None,
            ..jobs[0].clone()
        });

        let stats = build_stats(&[], &jobs, &[], &[]);
        assert_eq!(stats.average_print_minutes, 120.0);
    }

    #[test]
    fn job_sources_split_manual_and_octoprint() {
        let jobs = vec![
            job(
                "j1",
                "P1",
                None,
                None,
                "2024-01-01T00:00:00Z",
                "2024-01-01T01:00:00Z",
                Some("octoprint"),
            ),
            job(
                "j2",
                "P1",
                None,
                None,
                "2024-01-02T00:00:00Z",
                "2024-01-02T01:00:00Z",
                Some("manual"),
            ),
            job(
                "j3",
                "P1",
                None,
                None,
                "2024-01-03T00:00:00Z",
                "2024-01-03T01:00:00Z",
                None,
            ),
        ];

        let stats = build_stats(&[], &jobs, &[], &[]);
        assert_eq!(stats.job_sources.octoprint, 1);
        assert_eq!(stats.job_sources.manual, 2);
    }

    #[test]
    fn printer_status_reflects_overdue_intervals() {
        let printers = vec![printer("P1", "Prusa"), printer("P2", "Ender")];
        let intervals = vec![MaintenanceInterval {
            id: "i1".to_string(),
            user_id: "u1".to_string(),
            printer_id: "P1".to_string(),
            kind: "Nozzle Clean".to_string(),
            interval_prints: Some(1),
            interval_hours: None,
            created_at: stamp(),
            updated_at: stamp(),
        }];
        let jobs = vec![job(
            "j1",
            "P1",
            None,
            None,
            "2024-01-01T00:00:00Z",
            "2024-01-01T01:00:00Z",
            None,
        )];

        let stats = build_stats(&printers, &jobs, &[], &intervals);
        assert_eq!(stats.printer_statuses[0].status, "Maintenance Due");
        assert_eq!(stats.printer_statuses[1].status, "OK");
    }
}
