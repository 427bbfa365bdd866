//! Workflow execution interface and shared types.
//!
//! Defines [`WorkflowRunner`], the trait the batch pool drives, along with
//! [`ProcessInput`], [`ProcessOutput`], and [`ProcessError`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionRow;

/// Per-invocation process settings.
#[derive(Debug, Clone, Default)]
pub struct ProcessInput {
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<PathBuf>,
    /// Maximum wall-clock time before the process is killed; unbounded if `None`.
    pub timeout: Option<Duration>,
}

/// Captured output from a finished process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Stdout captured from the process (capped).
    pub stdout: String,
    /// Stderr captured from the process (capped).
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors that keep a process from producing an exit status.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The executable was not found.
    #[error("Executable not found: {0}")]
    NotFound(String),

    /// The executable exists but lacks execute permissions.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The process exceeded its configured timeout and was killed.
    #[error("Process timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed wall-clock time before the process was killed.
        elapsed_ms: u64,
    },

    /// An I/O error occurred while spawning or communicating with the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs the decomposition workflow for one acquisition.
///
/// A non-zero exit is reported through [`ProcessOutput::exit_code`], not as
/// an error, so callers keep the captured output in both cases.
pub trait WorkflowRunner: Send + Sync {
    /// Human-readable command line for `row`, used in plans and logs.
    fn describe(&self, row: &AcquisitionRow) -> String;

    /// Run the workflow for `row`.
    fn run(
        &self,
        row: &AcquisitionRow,
        input: ProcessInput,
    ) -> impl std::future::Future<Output = Result<ProcessOutput, ProcessError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
