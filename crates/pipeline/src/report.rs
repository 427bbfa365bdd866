//! Per-job outcomes and the batch summary.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// Final state of one workflow invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    /// Ran and exited non-zero, or could not be started.
    Failed,
    /// Killed after exceeding the job timeout.
    TimedOut,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub acquisition: String,
    pub subject: String,
    pub task: String,
    pub prefix: String,
    pub out_dir: PathBuf,
    pub status: JobStatus,
    /// Exit code when the process ran to completion.
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub duration_ms: u64,
    /// Captured stdout/stderr, when it could be written.
    pub log_path: Option<PathBuf>,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Summary of a whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cores: usize,
    /// Sorted by acquisition key.
    pub jobs: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|j| j.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub async fn write_json(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_vec_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PipelineError::Report {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|source| PipelineError::Report {
                path: path.to_path_buf(),
                source,
            })
    }
}
