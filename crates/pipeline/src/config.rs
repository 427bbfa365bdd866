use std::path::PathBuf;
use std::time::Duration;

use mebatch_core::discovery::MAX_FOLDER_DEPTH;
use mebatch_core::naming;

use crate::error::PipelineError;

/// Raw-data directory joined onto the BIDS root by default.
pub const DEFAULT_RAW_SUBDIR: &str = "rawdata";

/// Pause each job takes before invoking the workflow.
pub const DEFAULT_STAGGER: Duration = Duration::from_secs(2);

/// Batch configuration consumed by [`plan_batch`](crate::plan::plan_batch)
/// and [`run_batch`](crate::batch::run_batch).
///
/// | Field          | Default                          |
/// |----------------|----------------------------------|
/// | `raw_subdir`   | `rawdata`                        |
/// | `out_root`     | `<parent of fmriprep_dir>/tedana`|
/// | `cores`        | available parallelism            |
/// | `stagger`      | 2 s                              |
/// | `job_timeout`  | none                             |
/// | `skip_invalid` | `false`                          |
/// | `max_depth`    | `10`                             |
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// fMRIPrep output directory holding the per-echo preprocessed images.
    pub fmriprep_dir: PathBuf,
    /// BIDS dataset root.
    pub bids_dir: PathBuf,
    /// Sub-directory of `bids_dir` with the raw sidecars; empty = `bids_dir`.
    pub raw_subdir: String,
    /// Output root; derived from `fmriprep_dir` when `None`.
    pub out_root: Option<PathBuf>,
    /// Number of concurrent workflow processes.
    pub cores: usize,
    pub stagger: Duration,
    pub job_timeout: Option<Duration>,
    /// Log and skip echo files with malformed names instead of failing.
    pub skip_invalid: bool,
    pub max_depth: usize,
}

impl BatchConfig {
    /// Configuration with defaults for everything but the two input trees.
    pub fn new(fmriprep_dir: impl Into<PathBuf>, bids_dir: impl Into<PathBuf>) -> Self {
        Self {
            fmriprep_dir: fmriprep_dir.into(),
            bids_dir: bids_dir.into(),
            raw_subdir: DEFAULT_RAW_SUBDIR.to_string(),
            out_root: None,
            cores: default_cores(),
            stagger: DEFAULT_STAGGER,
            job_timeout: None,
            skip_invalid: false,
            max_depth: MAX_FOLDER_DEPTH,
        }
    }

    /// Directory searched for raw sidecars.
    pub fn raw_data_dir(&self) -> PathBuf {
        if self.raw_subdir.is_empty() {
            self.bids_dir.clone()
        } else {
            self.bids_dir.join(&self.raw_subdir)
        }
    }

    /// Output root, explicit or derived.
    pub fn resolved_out_root(&self) -> Result<PathBuf, PipelineError> {
        match &self.out_root {
            Some(root) => Ok(root.clone()),
            None => Ok(naming::default_out_root(&self.fmriprep_dir)?),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.cores == 0 {
            return Err(PipelineError::Config("cores must be at least 1".to_string()));
        }
        if self.max_depth == 0 {
            return Err(PipelineError::Config("max_depth must be at least 1".to_string()));
        }
        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PipelineError::Config("job timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Number of CPUs available to this process, or 1 if unknown.
pub fn default_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults() {
        let config = BatchConfig::new("/data/derivatives/fmriprep", "/data");
        assert_eq!(config.raw_subdir, "rawdata");
        assert_eq!(config.stagger, Duration::from_secs(2));
        assert!(config.cores >= 1);
        assert!(config.job_timeout.is_none());
        assert!(!config.skip_invalid);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn raw_dir_joins_subdir() {
        let config = BatchConfig::new("/d/fmriprep", "/data");
        assert_eq!(config.raw_data_dir(), Path::new("/data/rawdata"));
    }

    #[test]
    fn empty_subdir_uses_bids_root() {
        let mut config = BatchConfig::new("/d/fmriprep", "/data");
        config.raw_subdir = String::new();
        assert_eq!(config.raw_data_dir(), Path::new("/data"));
    }

    #[test]
    fn out_root_derived_or_explicit() {
        let mut config = BatchConfig::new("/data/derivatives/fmriprep", "/data");
        assert_eq!(
            config.resolved_out_root().expect("root"),
            Path::new("/data/derivatives/tedana")
        );
        config.out_root = Some(PathBuf::from("/scratch/out"));
        assert_eq!(config.resolved_out_root().expect("root"), Path::new("/scratch/out"));
    }

    #[test]
    fn zero_cores_rejected() {
        let mut config = BatchConfig::new("/d/fmriprep", "/data");
        config.cores = 0;
        assert_matches!(config.validate(), Err(PipelineError::Config(_)));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = BatchConfig::new("/d/fmriprep", "/data");
        config.job_timeout = Some(Duration::ZERO);
        assert_matches!(config.validate(), Err(PipelineError::Config(_)));
    }
}
