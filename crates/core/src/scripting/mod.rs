//! External workflow execution.
//!
//! Provides the [`WorkflowRunner`](executor::WorkflowRunner) seam, the
//! shared subprocess helper and the tedana CLI runner. Nothing here knows
//! about pools or batches; that lives in the pipeline crate.

pub mod executor;
pub mod subprocess;
pub mod tedana_cli;

pub use executor::{ProcessError, ProcessInput, ProcessOutput, WorkflowRunner};
pub use tedana_cli::TedanaCli;
