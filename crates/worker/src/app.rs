//! Subcommand handlers.

use std::sync::Arc;

use anyhow::Context;

use mebatch_pipeline::{plan_batch, run_batch};

use crate::cli::{Command, PlanArgs, PlanFormat, RunArgs};
use crate::output;

/// Exit status when every job succeeded.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status on a planning error or any failed job.
pub const EXIT_FAILURE: u8 = 1;

/// Run one subcommand and map its result to a process exit status.
pub async fn execute(command: Command) -> u8 {
    let result = match command {
        Command::Run(args) => run(args).await,
        Command::Plan(args) => plan(args).await,
    };

    match result {
        Ok(true) => EXIT_SUCCESS,
        Ok(false) => EXIT_FAILURE,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "mebatch failed");
            EXIT_FAILURE
        }
    }
}

/// Plan and run a batch. Returns `true` when every job succeeded.
pub async fn run(args: RunArgs) -> anyhow::Result<bool> {
    let config = args.to_config()?;
    let runner = args.tedana.runner().context("cannot use tedana")?;
    tracing::info!(
        program = %runner.program().display(),
        fmriprep_dir = %config.fmriprep_dir.display(),
        raw_dir = %config.raw_data_dir().display(),
        cores = config.cores,
        "Planning batch",
    );

    let plan = plan_batch(&config).await.context("planning failed")?;
    if plan.is_empty() {
        tracing::warn!("No multi-echo acquisitions found; nothing to run");
        return Ok(true);
    }

    let report = run_batch(Arc::new(runner), &plan, &config).await;
    print!("{}", output::report_summary(&report));

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .await
            .with_context(|| format!("cannot write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    Ok(report.all_succeeded())
}

/// Print the acquisition table without running anything.
pub async fn plan(args: PlanArgs) -> anyhow::Result<bool> {
    let config = args.batch.to_config();
    let runner = args.tedana.display_runner();
    let plan = plan_batch(&config).await.context("planning failed")?;

    match args.format {
        PlanFormat::Text => print!("{}", output::plan_text(&plan, &runner)),
        PlanFormat::Json => println!("{}", output::plan_json(&plan, &runner)?),
    }
    Ok(true)
}
