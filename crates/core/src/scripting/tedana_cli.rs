//! tedana executable runner.
//!
//! Runs the installed `tedana` entry point directly (not through a shell).
//! Validates that the executable exists and has execute permissions before
//! anything is spawned.

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::executor::{ProcessError, ProcessInput, ProcessOutput, WorkflowRunner};
use super::subprocess;
use crate::acquisition::AcquisitionRow;
use crate::tedana::{self, TedanaOptions, TEDANA_BIN};

/// Runner invoking the tedana command-line workflow.
#[derive(Debug, Clone)]
pub struct TedanaCli {
    program: PathBuf,
    options: TedanaOptions,
}

impl TedanaCli {
    /// Use `program` as-is, without checking it.
    pub fn new(program: PathBuf, options: TedanaOptions) -> Self {
        Self { program, options }
    }

    /// Resolve the executable: an explicit path is checked for existence and
    /// execute permission, otherwise `tedana` is looked up on `PATH`.
    pub fn resolve(explicit: Option<&Path>, options: TedanaOptions) -> Result<Self, ProcessError> {
        let program = match explicit {
            Some(path) => {
                check_executable(path)?;
                path.to_path_buf()
            }
            None => which::which(TEDANA_BIN)
                .map_err(|e| ProcessError::NotFound(format!("{TEDANA_BIN} on PATH ({e})")))?,
        };
        tracing::debug!(program = %program.display(), "Resolved tedana executable");
        Ok(Self::new(program, options))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument list for one acquisition.
    pub fn args_for(&self, row: &AcquisitionRow) -> Vec<OsString> {
        tedana::build_tedana_args(row, &self.options)
    }
}

impl WorkflowRunner for TedanaCli {
    fn describe(&self, row: &AcquisitionRow) -> String {
        tedana::render_command(&self.program.to_string_lossy(), &self.args_for(row))
    }

    async fn run(
        &self,
        row: &AcquisitionRow,
        input: ProcessInput,
    ) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.args_for(row));
        subprocess::run_command(&mut cmd, input).await
    }
}

/// Verify that `path` is an existing file with an execute bit set.
fn check_executable(path: &Path) -> Result<(), ProcessError> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| ProcessError::NotFound(path.display().to_string()))?;

    let mode = metadata.permissions().mode();
    if !metadata.is_file() || mode & 0o111 == 0 {
        return Err(ProcessError::PermissionDenied(format!(
            "{} is not executable (mode {mode:#o})",
            path.display()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::naming::parse_entities;

    fn row(out_dir: &Path) -> AcquisitionRow {
        AcquisitionRow {
            acquisition: "sub-01_task-rest".to_string(),
            subject: "sub-01".to_string(),
            task: "task-rest".to_string(),
            entities: parse_entities("sub-01_task-rest").expect("entities"),
            echoes: vec![1, 2],
            echo_files: vec![PathBuf::from("/prep/e1.nii.gz"), PathBuf::from("/prep/e2.nii.gz")],
            echo_times: vec![0.015, 0.04],
            out_dir: out_dir.to_path_buf(),
            prefix: "sub-01_task-rest_space-Native".to_string(),
        }
    }

    /// Write an executable bash script into `dir` and return its path.
    fn fake_tedana(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("tedana");
        std::fs::write(&path, format!("#!/bin/bash\n{body}")).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[test]
    fn resolve_missing_explicit_path() {
        let result = TedanaCli::resolve(Some(Path::new("/nonexistent/tedana")), TedanaOptions::default());
        assert_matches!(result, Err(ProcessError::NotFound(_)));
    }

    #[test]
    fn resolve_not_executable() {
        let f = tempfile::NamedTempFile::new().expect("create temp file");
        let result = TedanaCli::resolve(Some(f.path()), TedanaOptions::default());
        assert_matches!(result, Err(ProcessError::PermissionDenied(_)));
    }

    #[test]
    fn resolve_directory_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = TedanaCli::resolve(Some(dir.path()), TedanaOptions::default());
        assert_matches!(result, Err(ProcessError::PermissionDenied(_)));
    }

    #[test]
    fn describe_renders_full_command() {
        let cli = TedanaCli::new(PathBuf::from("/usr/bin/tedana"), TedanaOptions::default());
        let line = cli.describe(&row(Path::new("/out")));
        assert!(line.starts_with("/usr/bin/tedana -d /prep/e1.nii.gz /prep/e2.nii.gz -e 15 40"));
        assert!(line.ends_with("--fittype curvefit --tedpca kic --verbose"));
    }

    #[tokio::test]
    async fn run_passes_arguments() {
        let dir = tempfile::tempdir().expect("temp dir");
        let script = fake_tedana(dir.path(), "printf '%s ' \"$@\"\n");
        let cli = TedanaCli::resolve(Some(&script), TedanaOptions::default()).expect("resolve");

        let output = cli
            .run(&row(Path::new("/out")), ProcessInput::default())
            .await
            .expect("run");
        assert!(output.success());
        assert!(output.stdout.contains("--prefix sub-01_task-rest_space-Native"));
        assert!(output.stdout.contains("-e 15 40"));
    }

    #[tokio::test]
    async fn run_reports_failure_exit_code() {
        let dir = tempfile::tempdir().expect("temp dir");
        let script = fake_tedana(dir.path(), "echo 'bad mask' >&2\nexit 3\n");
        let cli = TedanaCli::resolve(Some(&script), TedanaOptions::default()).expect("resolve");

        let output = cli
            .run(&row(Path::new("/out")), ProcessInput::default())
            .await
            .expect("run");
        assert_eq!(output.exit_code, 3);
        assert!(output.stderr.contains("bad mask"));
    }
}
