//! Plan and report rendering for the terminal.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use mebatch_core::acquisition::AcquisitionRow;
use mebatch_core::scripting::WorkflowRunner;
use mebatch_pipeline::{BatchPlan, BatchReport};

#[derive(Serialize)]
struct PlannedJob<'a> {
    #[serde(flatten)]
    row: &'a AcquisitionRow,
    command: String,
}

#[derive(Serialize)]
struct PlanView<'a> {
    out_root: &'a Path,
    jobs: Vec<PlannedJob<'a>>,
}

/// Pretty JSON: every row plus the command that would run for it.
pub fn plan_json<R: WorkflowRunner>(plan: &BatchPlan, runner: &R) -> serde_json::Result<String> {
    let view = PlanView {
        out_root: &plan.out_root,
        jobs: plan
            .rows
            .iter()
            .map(|row| PlannedJob {
                row,
                command: runner.describe(row),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&view)
}

/// Human-readable acquisition table.
pub fn plan_text<R: WorkflowRunner>(plan: &BatchPlan, runner: &R) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} acquisition(s), output root {}",
        plan.rows.len(),
        plan.out_root.display()
    );
    for row in &plan.rows {
        let times: Vec<String> = row.echo_times.iter().map(|t| format!("{t}")).collect();
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", row.acquisition);
        let _ = writeln!(out, "  echoes:  {} ({} s)", row.echoes.len(), times.join(", "));
        let _ = writeln!(out, "  out_dir: {}", row.out_dir.display());
        let _ = writeln!(out, "  prefix:  {}", row.prefix);
        let _ = writeln!(out, "  $ {}", runner.describe(row));
    }
    out
}

/// One line per job plus a totals line.
pub fn report_summary(report: &BatchReport) -> String {
    let mut out = String::new();
    for job in &report.jobs {
        let _ = write!(out, "{:<10} {}", job.status.as_str(), job.acquisition);
        if let Some(error) = job.error.as_deref().and_then(|e| e.lines().next()) {
            let _ = write!(out, "  ({error})");
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(
        out,
        "{} succeeded, {} failed (batch {})",
        report.succeeded(),
        report.failed(),
        report.batch_id
    );
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Utc;
    use uuid::Uuid;

    use mebatch_core::naming::parse_entities;
    use mebatch_core::scripting::TedanaCli;
    use mebatch_core::tedana::TedanaOptions;
    use mebatch_pipeline::{JobOutcome, JobStatus};

    use super::*;

    fn plan() -> BatchPlan {
        BatchPlan {
            out_root: PathBuf::from("/d/tedana"),
            rows: vec![AcquisitionRow {
                acquisition: "sub-01_task-rest".to_string(),
                subject: "sub-01".to_string(),
                task: "task-rest".to_string(),
                entities: parse_entities("sub-01_task-rest").expect("entities"),
                echoes: vec![1, 2],
                echo_files: vec![PathBuf::from("/p/e1.nii.gz"), PathBuf::from("/p/e2.nii.gz")],
                echo_times: vec![0.015, 0.04],
                out_dir: PathBuf::from("/d/tedana/sub-01/task-rest"),
                prefix: "sub-01_task-rest_space-Native".to_string(),
            }],
        }
    }

    fn runner() -> TedanaCli {
        TedanaCli::new(PathBuf::from("tedana"), TedanaOptions::default())
    }

    #[test]
    fn text_plan_lists_command() {
        let text = plan_text(&plan(), &runner());
        assert!(text.starts_with("1 acquisition(s), output root /d/tedana"));
        assert!(text.contains("  echoes:  2 (0.015, 0.04 s)"));
        assert!(text.contains("  $ tedana -d /p/e1.nii.gz /p/e2.nii.gz -e 15 40"));
    }

    #[test]
    fn json_plan_flattens_rows() {
        let json = plan_json(&plan(), &runner()).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        let job = &value["jobs"][0];
        assert_eq!(value["out_root"], "/d/tedana");
        assert_eq!(job["acquisition"], "sub-01_task-rest");
        assert_eq!(job["prefix"], "sub-01_task-rest_space-Native");
        assert!(job["command"].as_str().expect("command").starts_with("tedana -d"));
    }

    #[test]
    fn summary_counts_jobs() {
        let report = BatchReport {
            batch_id: Uuid::nil(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cores: 1,
            jobs: vec![JobOutcome {
                acquisition: "sub-01_task-rest".to_string(),
                subject: "sub-01".to_string(),
                task: "task-rest".to_string(),
                prefix: "sub-01_task-rest_space-Native".to_string(),
                out_dir: PathBuf::from("/d"),
                status: JobStatus::Failed,
                exit_code: Some(2),
                error: Some("exit code 2: bad mask\nmore".to_string()),
                duration_ms: 10,
                log_path: None,
            }],
        };
        let text = report_summary(&report);
        assert!(text.contains("failed     sub-01_task-rest  (exit code 2: bad mask)"));
        assert!(text.contains("0 succeeded, 1 failed"));
    }
}
