use std::path::PathBuf;

use mebatch_core::acquisition::OutputConflict;
use mebatch_core::scripting::ProcessError;
use mebatch_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{} acquisition group(s) would overwrite each other's outputs: {}", .0.len(), describe_conflicts(.0))]
    OutputConflict(Vec<OutputConflict>),

    #[error("Failed to write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn describe_conflicts(conflicts: &[OutputConflict]) -> String {
    conflicts
        .iter()
        .map(|c| {
            format!(
                "[{}] -> {}/{}",
                c.acquisitions.join(", "),
                c.out_dir.display(),
                c.prefix
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}
