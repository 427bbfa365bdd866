//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use mebatch_core::acquisition::AcquisitionRow;
use mebatch_core::scripting::{ProcessError, ProcessInput, ProcessOutput, WorkflowRunner};
use mebatch_pipeline::BatchConfig;

/// Echo times (seconds) used for every fixture acquisition.
pub const ECHO_TIMES: [f64; 3] = [0.0145, 0.0385, 0.0625];

/// A BIDS root with `rawdata/` and `derivatives/fmriprep/` below it.
pub struct Dataset {
    pub dir: tempfile::TempDir,
}

impl Dataset {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("rawdata")).expect("create rawdata");
        std::fs::create_dir_all(dir.path().join("derivatives/fmriprep")).expect("create fmriprep");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn fmriprep_dir(&self) -> PathBuf {
        self.root().join("derivatives/fmriprep")
    }

    pub fn tedana_root(&self) -> PathBuf {
        self.root().join("derivatives/tedana")
    }

    /// Add a three-echo acquisition: preprocessed images and raw sidecars.
    pub fn add_acquisition(&self, subject: &str, acq: &str) {
        for (i, te) in ECHO_TIMES.iter().enumerate() {
            let echo = i + 1;
            self.add_image(subject, &format!("{acq}_echo-{echo}_desc-preproc_bold.nii.gz"));
            self.add_sidecar(subject, &format!("{acq}_echo-{echo}_bold.json"), *te);
        }
    }

    pub fn add_image(&self, subject: &str, file_name: &str) {
        let path = self.fmriprep_dir().join(subject).join("func").join(file_name);
        write(&path, "");
    }

    pub fn add_sidecar(&self, subject: &str, file_name: &str, echo_time: f64) {
        let path = self.root().join("rawdata").join(subject).join("func").join(file_name);
        write(&path, &format!(r#"{{"EchoTime": {echo_time}, "RepetitionTime": 2.0}}"#));
    }

    pub fn config(&self) -> BatchConfig {
        let mut config = BatchConfig::new(self.fmriprep_dir(), self.root());
        config.cores = 2;
        config.stagger = Duration::ZERO;
        config
    }
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    std::fs::write(path, contents).expect("write fixture");
}

/// Runner that records calls instead of spawning processes.
#[derive(Default)]
pub struct FakeRunner {
    pub calls: Mutex<Vec<String>>,
    pub failing: HashSet<String>,
    pub delay: Duration,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl FakeRunner {
    pub fn failing(acquisitions: &[&str]) -> Self {
        Self {
            failing: acquisitions.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn called(&self) -> Vec<String> {
        let mut calls = self.calls.lock().expect("lock calls").clone();
        calls.sort();
        calls
    }
}

impl WorkflowRunner for FakeRunner {
    fn describe(&self, row: &AcquisitionRow) -> String {
        format!("fake-tedana {}", row.acquisition)
    }

    async fn run(
        &self,
        row: &AcquisitionRow,
        _input: ProcessInput,
    ) -> Result<ProcessOutput, ProcessError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        self.calls
            .lock()
            .expect("lock calls")
            .push(row.acquisition.clone());

        let failed = self.failing.contains(&row.acquisition);
        Ok(ProcessOutput {
            stdout: format!("processed {}", row.acquisition),
            stderr: if failed { "boom".to_string() } else { String::new() },
            exit_code: if failed { 1 } else { 0 },
            duration_ms: self.delay.as_millis() as u64,
        })
    }
}
