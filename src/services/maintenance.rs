use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::{MaintenanceInterval, MaintenanceLog, PrintJob};

/// Due state of a maintenance interval, derived from usage since the last
/// recorded service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DueStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "Due Soon")]
    DueSoon,
    #[serde(rename = "Overdue")]
    Overdue,
}

/// Accumulated usage for one interval since its baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Usage {
    pub jobs_since: u32,
    pub hours_since: f64,
}

/// Full evaluation result for one interval.
#[derive(Debug, Clone, Serialize)]
pub struct DueReport {
    pub interval_id: String,
    pub printer_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: DueStatus,
    pub jobs_since: u32,
    pub hours_since: f64,
    /// `None` when no prints threshold is configured; negative means overdue by N prints.
    pub prints_remaining: Option<i64>,
    /// `None` when no hours threshold is configured; negative means overdue by N hours.
    pub hours_remaining: Option<f64>,
}

/// Parse an ISO-8601 instant as stored in `start_time`/`end_time`/`date`
/// columns. Values arrive from forms and from OctoPrint as strings, so a
/// malformed value is expected input, not an error.
fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Duration of a job in hours. Zero unless both timestamps parse and the job
/// ended after it started.
pub fn job_duration_hours(job: &PrintJob) -> f64 {
    let start = job.start_time.as_deref().and_then(parse_instant);
    let end = job.end_time.as_deref().and_then(parse_instant);
    match (start, end) {
        (Some(start), Some(end)) if end > start => {
            (end - start).num_milliseconds() as f64 / 3_600_000.0
        }
        _ => 0.0,
    }
}

/// Compute usage accumulated for `interval` since its baseline.
///
/// The baseline is the most recent maintenance log for the interval's
/// printer and type (ties broken by highest date, then highest id). Logs
/// whose date does not parse are skipped when picking the baseline. With no
/// baseline the printer's entire job history counts.
///
/// A job counts toward `jobs_since` when its printer matches and either
/// there is no baseline or its start time parses to an instant after the
/// baseline. Jobs with missing or malformed timestamps contribute zero
/// hours but still count where they pass that filter.
pub fn usage_since(
    interval: &MaintenanceInterval,
    logs: &[MaintenanceLog],
    jobs: &[PrintJob],
) -> Usage {
    let baseline = logs
        .iter()
        .filter(|log| log.printer_id == interval.printer_id && log.kind == interval.kind)
        .filter_map(|log| parse_instant(&log.date).map(|at| (at, &log.id)))
        .max()
        .map(|(at, _)| at);

    let mut jobs_since = 0u32;
    let mut hours_since = 0f64;

    for job in jobs.iter().filter(|j| j.printer_id == interval.printer_id) {
        if let Some(since) = baseline {
            let started = job.start_time.as_deref().and_then(parse_instant);
            match started {
                Some(at) if at > since => {}
                _ => continue,
            }
        }
        jobs_since += 1;
        hours_since += job_duration_hours(job);
    }

    Usage {
        jobs_since,
        hours_since,
    }
}

/// Map usage against the interval's thresholds.
///
/// Thresholds are genuinely optional: an unset threshold is not evaluated on
/// that axis, and an interval with neither threshold is permanently `Ok`.
pub fn due_status(interval: &MaintenanceInterval, usage: &Usage) -> DueStatus {
    let jobs = i64::from(usage.jobs_since);

    let overdue_by_prints = interval.interval_prints.is_some_and(|limit| jobs >= limit);
    let overdue_by_hours = interval
        .interval_hours
        .is_some_and(|limit| usage.hours_since >= limit);
    if overdue_by_prints || overdue_by_hours {
        return DueStatus::Overdue;
    }

    let soon_by_prints = interval
        .interval_prints
        .is_some_and(|limit| jobs >= limit - 1);
    let soon_by_hours = interval
        .interval_hours
        .is_some_and(|limit| usage.hours_since >= limit - 1.0);
    if soon_by_prints || soon_by_hours {
        return DueStatus::DueSoon;
    }

    DueStatus::Ok
}

/// Remaining usage until each configured threshold. Always computed from
/// accumulated usage; a prior log never short-circuits the result back to
/// the full interval.
pub fn remaining(interval: &MaintenanceInterval, usage: &Usage) -> (Option<i64>, Option<f64>) {
    let prints = interval
        .interval_prints
        .map(|limit| limit - i64::from(usage.jobs_since));
    let hours = interval.interval_hours.map(|limit| limit - usage.hours_since);
    (prints, hours)
}

/// Evaluate one interval against a consistent snapshot of the owner's
/// maintenance logs and print jobs.
pub fn evaluate(
    interval: &MaintenanceInterval,
    logs: &[MaintenanceLog],
    jobs: &[PrintJob],
) -> DueReport {
    let usage = usage_since(interval, logs, jobs);
    let status = due_status(interval, &usage);
    let (prints_remaining, hours_remaining) = remaining(interval, &usage);

    DueReport {
        interval_id: interval.id.clone(),
        printer_id: interval.printer_id.clone(),
        kind: interval.kind.clone(),
        status,
        jobs_since: usage.jobs_since,
        hours_since: usage.hours_since,
        prints_remaining,
        hours_remaining,
    }
}

/// Sort reports most urgent first, ascending by the smaller of prints
/// remaining and whole days remaining. Mixing the two units is acceptable
/// for relative ranking only; the authoritative state is `status`.
/// Intervals with no thresholds sort last.
pub fn rank_by_urgency(reports: &mut [DueReport]) {
    reports.sort_by_key(urgency_key);
}

fn urgency_key(report: &DueReport) -> i64 {
    let days_remaining = report
        .hours_remaining
        .map(|hours| (hours / 24.0).floor() as i64);
    match (report.prints_remaining, days_remaining) {
        (Some(prints), Some(days)) => prints.min(days),
        (Some(prints), None) => prints,
        (None, Some(days)) => days,
        (None, None) => i64::MAX,
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

    fn interval(prints: Option<i64>, hours: Option<f64>) -> MaintenanceInterval {
        MaintenanceInterval {
            id: "int-1".to_string(),
            user_id: "u1".to_string(),
            printer_id: "P1".to_string(),
            kind: "Nozzle Clean".to_string(),
            interval_prints: prints,
            interval_hours: hours,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    fn log(id: &str, printer_id: &str, kind: &str, date: &str) -> MaintenanceLog {
        MaintenanceLog {
            id: id.to_string(),
            user_id: "u1".to_string(),
            printer_id: printer_id.to_string(),
            kind: kind.to_string(),
            date: date.to_string(),
            notes: None,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    fn job(id: &str, printer_id: &str, start: Option<&str>, end: Option<&str>) -> PrintJob {
        PrintJob {
            id: id.to_string(),
            user_id: "u1".to_string(),
            printer_id: printer_id.to_string(),
            name: format!("job {}", id),
            material: None,
            grams_used: None,
            status: Some("Success".to_string()),
            start_time: start.map(str::to_string),
            end_time: end.map(str::to_string),
            source: None,
            notes: None,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    fn timed_job(id: &str, start: &str, end: &str) -> PrintJob {
        job(id, "P1", Some(start), Some(end))
    }

    #[test]
    fn no_thresholds_is_always_ok() {
        let interval = interval(None, None);
        let jobs: Vec<PrintJob> = (0..50)
            .map(|i| {
                timed_job(
                    &format!("j{}", i),
                    "2024-01-01T00:00:00Z",
                    "2024-01-01T08:00:00Z",
                )
            })
            .collect();

        let usage = usage_since(&interval, &[], &jobs);
        assert_eq!(usage.jobs_since, 50);
        assert_eq!(due_status(&interval, &usage), DueStatus::Ok);
        assert_eq!(remaining(&interval, &usage), (None, None));
    }

    #[test]
    fn missing_timestamps_count_jobs_but_not_hours() {
        let interval = interval(Some(10), Some(10.0));
        let jobs = vec![
            job("j1", "P1", None, None),
            job("j2", "P1", Some("2024-01-01T00:00:00Z"), None),
            job("j3", "P1", None, Some("2024-01-01T02:00:00Z")),
            job(
                "j4",
                "P2",
                Some("2024-01-01T00:00:00Z"),
                Some("2024-01-01T02:00:00Z"),
            ),
        ];

        let usage = usage_since(&interval, &[], &jobs);
        // j4 is another printer; the rest match even without usable timestamps
        assert_eq!(usage.jobs_since, 3);
        assert_eq!(usage.hours_since, 0.0);
    }

    #[test]
    fn malformed_timestamps_contribute_zero_hours() {
        let interval = interval(None, Some(100.0));
        let jobs = vec![
            job("j1", "P1", Some("not a date"), Some("also not a date")),
            job("j2", "P1", Some("2024-01-01T00:00:00Z"), Some("garbage")),
        ];

        let usage = usage_since(&interval, &[], &jobs);
        assert_eq!(usage.jobs_since, 2);
        assert_eq!(usage.hours_since, 0.0);
    }

    #[test]
    fn end_before_start_contributes_zero_hours() {
        let interval = interval(None, Some(10.0));
        let jobs = vec![
            timed_job("j1", "2024-01-02T00:00:00Z", "2024-01-01T00:00:00Z"),
            timed_job("j2", "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z"),
        ];

        let usage = usage_since(&interval, &[], &jobs);
        assert_eq!(usage.jobs_since, 2);
        assert_eq!(usage.hours_since, 0.0);
    }

    #[test]
    fn pure_and_idempotent() {
        let interval = interval(Some(5), Some(10.0));
        let logs = vec![log("m1", "P1", "Nozzle Clean", "2024-01-05T00:00:00Z")];
        let jobs = vec![timed_job("j1", "2024-01-06T00:00:00Z", "2024-01-06T03:00:00Z")];

        let first = usage_since(&interval, &logs, &jobs);
        let second = usage_since(&interval, &logs, &jobs);
        assert_eq!(first, second);
        assert_eq!(
            due_status(&interval, &first),
            due_status(&interval, &second)
        );
    }

    #[test]
    fn adding_a_job_after_baseline_never_decreases_usage() {
        let interval = interval(Some(5), Some(10.0));
        let logs = vec![log("m1", "P1", "Nozzle Clean", "2024-01-05T00:00:00Z")];
        let mut jobs = vec![timed_job("j1", "2024-01-06T00:00:00Z", "2024-01-06T03:00:00Z")];

        let before = usage_since(&interval, &logs, &jobs);
        jobs.push(timed_job(
            "j2",
            "2024-01-07T00:00:00Z",
            "2024-01-07T01:30:00Z",
        ));
        let after = usage_since(&interval, &logs, &jobs);

        assert!(after.jobs_since >= before.jobs_since);
        assert!(after.hours_since >= before.hours_since);
    }

    #[test]
    fn prints_threshold_boundaries() {
        let interval = interval(Some(5), None);

        let at = Usage {
            jobs_since: 5,
            hours_since: 0.0,
        };
        assert_eq!(due_status(&interval, &at), DueStatus::Overdue);

        let near = Usage {
            jobs_since: 4,
            hours_since: 0.0,
        };
        assert_eq!(due_status(&interval, &near), DueStatus::DueSoon);

        let clear = Usage {
            jobs_since: 3,
            hours_since: 0.0,
        };
        assert_eq!(due_status(&interval, &clear), DueStatus::Ok);
    }

    #[test]
    fn five_jobs_no_logs_is_overdue_with_zero_prints_remaining() {
        let interval = interval(Some(5), None);
        let jobs: Vec<PrintJob> = (0..5)
            .map(|i| {
                timed_job(
                    &format!("j{}", i),
                    "2024-01-01T00:00:00Z",
                    "2024-01-01T01:00:00Z",
                )
            })
            .collect();

        let report = evaluate(&interval, &[], &jobs);
        assert_eq!(report.status, DueStatus::Overdue);
        assert_eq!(report.prints_remaining, Some(0));
        assert_eq!(report.hours_remaining, None);
    }

    #[test]
    fn four_jobs_no_logs_is_due_soon_with_one_print_remaining() {
        let interval = interval(Some(5), None);
        let jobs: Vec<PrintJob> = (0..4)
            .map(|i| {
                timed_job(
                    &format!("j{}", i),
                    "2024-01-01T00:00:00Z",
                    "2024-01-01T01:00:00Z",
                )
            })
            .collect();

        let report = evaluate(&interval, &[], &jobs);
        assert_eq!(report.status, DueStatus::DueSoon);
        assert_eq!(report.prints_remaining, Some(1));
    }

    #[test]
    fn jobs_before_baseline_are_excluded() {
        let interval = interval(Some(5), None);
        let logs = vec![log("m1", "P1", "Nozzle Clean", "2024-01-10T00:00:00Z")];
        let jobs = vec![
            timed_job("old1", "2024-01-01T00:00:00Z", "2024-01-01T04:00:00Z"),
            timed_job("old2", "2024-01-09T00:00:00Z", "2024-01-09T04:00:00Z"),
            timed_job("new1", "2024-01-11T00:00:00Z", "2024-01-11T04:00:00Z"),
            timed_job("new2", "2024-01-12T00:00:00Z", "2024-01-12T04:00:00Z"),
        ];

        let report = evaluate(&interval, &logs, &jobs);
        assert_eq!(report.jobs_since, 2);
        assert_eq!(report.status, DueStatus::Ok);
        assert_eq!(report.prints_remaining, Some(3));
    }

    #[test]
    fn most_recent_log_wins_as_baseline() {
        let interval = interval(Some(5), None);
        let logs = vec![
            log("m1", "P1", "Nozzle Clean", "2024-01-01T00:00:00Z"),
            log("m2", "P1", "Nozzle Clean", "2024-01-10T00:00:00Z"),
            log("m3", "P1", "Bed Level", "2024-01-20T00:00:00Z"),
            log("m4", "P2", "Nozzle Clean", "2024-01-20T00:00:00Z"),
        ];
        let jobs = vec![
            timed_job("j1", "2024-01-05T00:00:00Z", "2024-01-05T01:00:00Z"),
            timed_job("j2", "2024-01-15T00:00:00Z", "2024-01-15T01:00:00Z"),
        ];

        // Only the job after the 2024-01-10 Nozzle Clean log counts; logs for
        // other types or printers do not move the baseline.
        let usage = usage_since(&interval, &logs, &jobs);
        assert_eq!(usage.jobs_since, 1);
    }

    #[test]
    fn unparsable_log_dates_are_ignored_for_baseline() {
        let interval = interval(Some(5), None);
        let logs = vec![
            log("m1", "P1", "Nozzle Clean", "never"),
            log("m2", "P1", "Nozzle Clean", "2024-01-10T00:00:00Z"),
        ];
        let jobs = vec![
            timed_job("j1", "2024-01-05T00:00:00Z", "2024-01-05T01:00:00Z"),
            timed_job("j2", "2024-01-15T00:00:00Z", "2024-01-15T01:00:00Z"),
        ];

        let usage = usage_since(&interval, &logs, &jobs);
        assert_eq!(usage.jobs_since, 1);

        // With only unparsable log dates there is no baseline at all.
        let broken = vec![log("m1", "P1", "Nozzle Clean", "never")];
        let usage = usage_since(&interval, &broken, &jobs);
        assert_eq!(usage.jobs_since, 2);
    }

    #[test]
    fn hours_threshold_overdue_with_negative_remaining() {
        let interval = interval(None, Some(10.0));
        let jobs = vec![
            timed_job("j1", "2024-01-01T00:00:00Z", "2024-01-01T06:00:00Z"),
            timed_job("j2", "2024-01-02T00:00:00Z", "2024-01-02T05:00:00Z"),
        ];

        let report = evaluate(&interval, &[], &jobs);
        assert_eq!(report.hours_since, 11.0);
        assert_eq!(report.status, DueStatus::Overdue);
        assert_eq!(report.hours_remaining, Some(-1.0));
        assert_eq!(report.prints_remaining, None);
    }

    #[test]
    fn either_threshold_triggers_overdue() {
        let interval = interval(Some(100), Some(10.0));
        let usage = Usage {
            jobs_since: 1,
            hours_since: 10.0,
        };
        assert_eq!(due_status(&interval, &usage), DueStatus::Overdue);
    }

    #[test]
    fn progress_survives_a_prior_log() {
        // Two jobs after the last service must show as true remaining
        // progress, not a display reset to the full interval.
        let interval = interval(Some(5), None);
        let logs = vec![log("m1", "P1", "Nozzle Clean", "2024-01-10T00:00:00Z")];
        let jobs = vec![
            timed_job("j1", "2024-01-11T00:00:00Z", "2024-01-11T01:00:00Z"),
            timed_job("j2", "2024-01-12T00:00:00Z", "2024-01-12T01:00:00Z"),
        ];

        let report = evaluate(&interval, &logs, &jobs);
        assert_eq!(report.jobs_since, 2);
        assert_eq!(report.status, DueStatus::Ok);
        assert_eq!(report.prints_remaining, Some(3));
    }

    #[test]
    fn ranking_puts_most_urgent_first_and_unbounded_last() {
        let mut reports = vec![
            DueReport {
                interval_id: "a".to_string(),
                printer_id: "P1".to_string(),
                kind: "Bed Level".to_string(),
                status: DueStatus::Ok,
                jobs_since: 0,
                hours_since: 0.0,
                prints_remaining: Some(4),
                hours_remaining: None,
            },
            DueReport {
                interval_id: "b".to_string(),
                printer_id: "P1".to_string(),
                kind: "Nozzle Clean".to_string(),
                status: DueStatus::Overdue,
                jobs_since: 7,
                hours_since: 0.0,
                prints_remaining: Some(-2),
                hours_remaining: None,
            },
            DueReport {
                interval_id: "c".to_string(),
                printer_id: "P1".to_string(),
                kind: "Lubrication".to_string(),
                status: DueStatus::Ok,
                jobs_since: 0,
                hours_since: 0.0,
                prints_remaining: None,
                hours_remaining: None,
            },
            DueReport {
                interval_id: "d".to_string(),
                printer_id: "P1".to_string(),
                kind: "General Inspection".to_string(),
                status: DueStatus::Ok,
                jobs_since: 0,
                hours_since: 2.0,
                // floor(50 / 24) = 2 days, ranks ahead of 4 prints
                prints_remaining: Some(9),
                hours_remaining: Some(50.0),
            },
        ];

        rank_by_urgency(&mut reports);

        let order: Vec<&str> = reports.iter().map(|r| r.interval_id.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }
}
