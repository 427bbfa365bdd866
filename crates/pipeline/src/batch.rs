//! Fixed-size worker pool running one workflow invocation per acquisition.
//!
//! Jobs share no state: each one waits for a pool slot, pauses for the
//! configured stagger, creates its output directory, runs the workflow and
//! writes the captured output next to the results. A failing job never
//! affects its siblings; every outcome ends up in the [`BatchReport`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use mebatch_core::acquisition::AcquisitionRow;
use mebatch_core::scripting::{ProcessError, ProcessInput, ProcessOutput, WorkflowRunner};

use crate::config::BatchConfig;
use crate::plan::BatchPlan;
use crate::report::{BatchReport, JobOutcome, JobStatus};

/// Suffix of the per-job log written into the output directory.
pub const JOB_LOG_SUFFIX: &str = "_mebatch.log";

/// Lines of stderr kept in a failed job's error message.
const STDERR_TAIL_LINES: usize = 20;

/// Run the workflow for every row of `plan` on a pool of `config.cores`.
pub async fn run_batch<R>(runner: Arc<R>, plan: &BatchPlan, config: &BatchConfig) -> BatchReport
where
    R: WorkflowRunner + 'static,
{
    let batch_id = Uuid::now_v7();
    let started_at = Utc::now();
    let cores = config.cores.max(1);
    let semaphore = Arc::new(Semaphore::new(cores));

    tracing::info!(
        %batch_id,
        jobs = plan.rows.len(),
        cores,
        "Starting batch",
    );

    let mut handles = Vec::with_capacity(plan.rows.len());
    for row in plan.rows.iter().cloned() {
        let semaphore = Arc::clone(&semaphore);
        let runner = Arc::clone(&runner);
        let stagger = config.stagger;
        let input = ProcessInput {
            timeout: config.job_timeout,
            ..ProcessInput::default()
        };
        let placeholder = row.clone();

        let handle = tokio::spawn(async move {
            // Hold the slot until the job is done.
            let _permit = semaphore.acquire_owned().await.ok();
            tokio::time::sleep(stagger).await;
            run_job(runner.as_ref(), &row, input).await
        });
        handles.push((placeholder, handle));
    }

    let mut jobs = Vec::with_capacity(handles.len());
    for (row, handle) in handles {
        match handle.await {
            Ok(outcome) => jobs.push(outcome),
            Err(e) => {
                tracing::error!(acquisition = %row.acquisition, error = %e, "Job task panicked");
                jobs.push(outcome_for(
                    &row,
                    JobStatus::Failed,
                    None,
                    Some(format!("Task panicked: {e}")),
                    0,
                    None,
                ));
            }
        }
    }
    jobs.sort_by(|a, b| a.acquisition.cmp(&b.acquisition));

    let report = BatchReport {
        batch_id,
        started_at,
        finished_at: Utc::now(),
        cores,
        jobs,
    };

    tracing::info!(
        %batch_id,
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Batch finished",
    );
    report
}

/// Run a single acquisition and turn every result into an outcome.
pub async fn run_job<R>(runner: &R, row: &AcquisitionRow, input: ProcessInput) -> JobOutcome
where
    R: WorkflowRunner,
{
    let start = Instant::now();
    let command = runner.describe(row);
    tracing::info!(acquisition = %row.acquisition, out_dir = %row.out_dir.display(), "Starting tedana");
    tracing::debug!(acquisition = %row.acquisition, %command, "Workflow command");

    if let Err(e) = tokio::fs::create_dir_all(&row.out_dir).await {
        tracing::error!(acquisition = %row.acquisition, error = %e, "Cannot create output directory");
        return outcome_for(
            row,
            JobStatus::Failed,
            None,
            Some(format!("Cannot create {}: {e}", row.out_dir.display())),
            elapsed_ms(start),
            None,
        );
    }

    match runner.run(row, input).await {
        Ok(output) => {
            let log_path = write_job_log(row, &command, &output).await;
            if output.success() {
                tracing::info!(
                    acquisition = %row.acquisition,
                    duration_ms = output.duration_ms,
                    "tedana finished",
                );
                outcome_for(
                    row,
                    JobStatus::Succeeded,
                    Some(output.exit_code),
                    None,
                    output.duration_ms,
                    log_path,
                )
            } else {
                let tail = tail_lines(&output.stderr, STDERR_TAIL_LINES);
                tracing::error!(
                    acquisition = %row.acquisition,
                    exit_code = output.exit_code,
                    stderr = %tail,
                    "tedana failed",
                );
                outcome_for(
                    row,
                    JobStatus::Failed,
                    Some(output.exit_code),
                    Some(format!("exit code {}: {tail}", output.exit_code)),
                    output.duration_ms,
                    log_path,
                )
            }
        }
        Err(err) => {
            let status = match err {
                ProcessError::Timeout { .. } => JobStatus::TimedOut,
                _ => JobStatus::Failed,
            };
            tracing::error!(acquisition = %row.acquisition, error = %err, "tedana did not complete");
            outcome_for(
                row,
                status,
                None,
                Some(err.to_string()),
                elapsed_ms(start),
                None,
            )
        }
    }
}

/// Path of the captured-output log for a row.
pub fn job_log_path(row: &AcquisitionRow) -> PathBuf {
    row.out_dir.join(format!("{}{JOB_LOG_SUFFIX}", row.prefix))
}

/// Write the command and captured streams next to the outputs.
///
/// A log that cannot be written is reported but does not fail the job.
async fn write_job_log(row: &AcquisitionRow, command: &str, output: &ProcessOutput) -> Option<PathBuf> {
    let path = job_log_path(row);
    let contents = format!(
        "$ {command}\n# exit code {} after {} ms\n\n--- stdout ---\n{}\n--- stderr ---\n{}\n",
        output.exit_code, output.duration_ms, output.stdout, output.stderr
    );
    match tokio::fs::write(&path, contents).await {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not write job log");
            None
        }
    }
}

fn outcome_for(
    row: &AcquisitionRow,
    status: JobStatus,
    exit_code: Option<i32>,
    error: Option<String>,
    duration_ms: u64,
    log_path: Option<PathBuf>,
) -> JobOutcome {
    JobOutcome {
        acquisition: row.acquisition.clone(),
        subject: row.subject.clone(),
        task: row.task.clone(),
        prefix: row.prefix.clone(),
        out_dir: row.out_dir.clone(),
        status,
        exit_code,
        error,
        duration_ms,
        log_path,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Last `n` non-empty lines of `text`, joined with newlines.
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_last_lines() {
        let text = "one\n\ntwo\nthree\nfour\n";
        assert_eq!(tail_lines(text, 2), "three\nfour");
        assert_eq!(tail_lines(text, 10), "one\ntwo\nthree\nfour");
        assert_eq!(tail_lines("", 3), "");
    }
}
