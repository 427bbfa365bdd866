//! Command-line arguments.
//!
//! Every option can also be set through a `MEBATCH_*` environment variable
//! (or a `.env` file loaded before parsing).

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use mebatch_core::scripting::TedanaCli;
use mebatch_core::tedana::{FitType, GsControl, TedPca, TedanaOptions, TEDANA_BIN};
use mebatch_pipeline::config::DEFAULT_RAW_SUBDIR;
use mebatch_pipeline::BatchConfig;

#[derive(Debug, Parser)]
#[command(name = "mebatch")]
#[command(about = "Batch tedana multi-echo denoising over fMRIPrep outputs", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true, env = "MEBATCH_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover acquisitions and run tedana on each one
    Run(RunArgs),
    /// Print the acquisition table and tedana commands without running anything
    Plan(PlanArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    #[command(flatten)]
    pub tedana: TedanaArgs,

    /// Seconds each job waits before starting tedana
    #[arg(long, env = "MEBATCH_STAGGER_SECS", default_value_t = 2.0)]
    pub stagger_secs: f64,

    /// Kill a tedana process after this many seconds
    #[arg(long, env = "MEBATCH_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Write the batch report as JSON to this path
    #[arg(long, env = "MEBATCH_REPORT")]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    #[command(flatten)]
    pub tedana: TedanaArgs,

    #[arg(long, env = "MEBATCH_FORMAT", value_enum, default_value_t = PlanFormat::Text)]
    pub format: PlanFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Text,
    Json,
}

/// Input trees and planning options shared by both subcommands.
#[derive(Debug, Args)]
pub struct BatchArgs {
    /// fMRIPrep output directory (run with --me-output-echoes)
    #[arg(long, env = "MEBATCH_FMRIPREP_DIR")]
    pub fmriprep_dir: PathBuf,

    /// BIDS dataset root
    #[arg(long, env = "MEBATCH_BIDS_DIR")]
    pub bids_dir: PathBuf,

    /// Sub-directory of the BIDS root holding raw sidecars ("" for the root itself)
    #[arg(long, env = "MEBATCH_RAW_SUBDIR", default_value = DEFAULT_RAW_SUBDIR)]
    pub raw_subdir: String,

    /// Number of concurrent tedana processes [default: available CPUs]
    #[arg(long, env = "MEBATCH_CORES")]
    pub cores: Option<usize>,

    /// Output root [default: <parent of fmriprep dir>/tedana]
    #[arg(long, env = "MEBATCH_OUT_ROOT")]
    pub out_root: Option<PathBuf>,

    /// Skip echo files with malformed names instead of failing
    #[arg(long, env = "MEBATCH_SKIP_INVALID")]
    pub skip_invalid: bool,
}

/// Workflow options passed through to every tedana invocation.
#[derive(Debug, Args)]
pub struct TedanaArgs {
    /// tedana executable [default: looked up on PATH]
    #[arg(long, env = "MEBATCH_TEDANA_BIN")]
    pub tedana_bin: Option<PathBuf>,

    /// T2*/S0 fit method (loglin, curvefit)
    #[arg(long, env = "MEBATCH_FITTYPE", default_value_t = FitType::Curvefit)]
    pub fittype: FitType,

    /// PCA selection criterion (mdl, kic, aic)
    #[arg(long, env = "MEBATCH_TEDPCA", default_value_t = TedPca::Kic)]
    pub tedpca: TedPca,

    /// Global signal control methods (gsr, mir), comma-separated
    #[arg(long, env = "MEBATCH_GSCONTROL", value_delimiter = ',')]
    pub gscontrol: Vec<GsControl>,

    /// Do not pass --verbose to tedana
    #[arg(long, env = "MEBATCH_NO_VERBOSE")]
    pub no_verbose: bool,

    /// Threads per tedana process
    #[arg(long, env = "MEBATCH_N_THREADS")]
    pub n_threads: Option<u32>,

    /// Let tedana overwrite existing outputs
    #[arg(long, env = "MEBATCH_OVERWRITE")]
    pub overwrite: bool,
}

impl BatchArgs {
    pub fn to_config(&self) -> BatchConfig {
        let mut config = BatchConfig::new(&self.fmriprep_dir, &self.bids_dir);
        config.raw_subdir = self.raw_subdir.clone();
        config.out_root = self.out_root.clone();
        config.skip_invalid = self.skip_invalid;
        if let Some(cores) = self.cores {
            config.cores = cores;
        }
        config
    }
}

impl RunArgs {
    /// Batch configuration including pool timing options.
    pub fn to_config(&self) -> anyhow::Result<BatchConfig> {
        let mut config = self.batch.to_config();
        config.stagger = Duration::try_from_secs_f64(self.stagger_secs)
            .map_err(|e| anyhow::anyhow!("invalid --stagger-secs {}: {e}", self.stagger_secs))?;
        config.job_timeout = self.timeout_secs.map(Duration::from_secs);
        Ok(config)
    }
}

impl TedanaArgs {
    pub fn to_options(&self) -> TedanaOptions {
        TedanaOptions {
            fittype: self.fittype,
            tedpca: self.tedpca,
            gscontrol: self.gscontrol.clone(),
            verbose: !self.no_verbose,
            n_threads: self.n_threads,
            overwrite: self.overwrite,
        }
    }

    /// Runner for `run`: the executable must exist.
    pub fn runner(&self) -> anyhow::Result<TedanaCli> {
        Ok(TedanaCli::resolve(self.tedana_bin.as_deref(), self.to_options())?)
    }

    /// Runner for `plan`: falls back to the bare program name so commands
    /// can be shown on machines without tedana.
    pub fn display_runner(&self) -> TedanaCli {
        match TedanaCli::resolve(self.tedana_bin.as_deref(), self.to_options()) {
            Ok(cli) => cli,
            Err(e) => {
                tracing::warn!(error = %e, "tedana not resolved; showing commands with bare program name");
                let program = self
                    .tedana_bin
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(TEDANA_BIN));
                TedanaCli::new(program, self.to_options())
            }
        }
    }
}
