//! `mebatch-pipeline` -- batch planning and the worker pool.
//!
//! [`plan::plan_batch`] turns two directory trees into an acquisition
//! table; [`batch::run_batch`] drives a [`WorkflowRunner`] over it with a
//! fixed number of concurrent processes.
//!
//! [`WorkflowRunner`]: mebatch_core::scripting::WorkflowRunner

pub mod batch;
pub mod config;
pub mod error;
pub mod plan;
pub mod report;

pub use batch::run_batch;
pub use config::BatchConfig;
pub use error::PipelineError;
pub use plan::{plan_batch, BatchPlan};
pub use report::{BatchReport, JobOutcome, JobStatus};
