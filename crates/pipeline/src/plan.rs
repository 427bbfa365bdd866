//! Batch planning: walk both trees and build the acquisition table.

use std::path::PathBuf;

use serde::Serialize;

use mebatch_core::acquisition::{self, AcquisitionRow};
use mebatch_core::discovery::{self, EchoFileKind};

use crate::config::BatchConfig;
use crate::error::PipelineError;

/// The acquisition table for one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchPlan {
    pub out_root: PathBuf,
    pub rows: Vec<AcquisitionRow>,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Discover echo images and sidecars and group them into a plan.
///
/// Any malformed name (unless skipped), unreadable sidecar, missing echo or
/// output collision aborts planning before a single process is spawned.
pub async fn plan_batch(config: &BatchConfig) -> Result<BatchPlan, PipelineError> {
    config.validate()?;
    let out_root = config.resolved_out_root()?;

    let prep_files = discovery::discover_files(&config.fmriprep_dir, config.max_depth).await?;
    let images =
        discovery::collect_echo_files(&prep_files, EchoFileKind::PreprocImage, config.skip_invalid)?;
    tracing::info!(
        fmriprep_dir = %config.fmriprep_dir.display(),
        files = prep_files.len(),
        echo_images = images.len(),
        "Scanned preprocessed outputs",
    );

    if images.is_empty() {
        tracing::warn!("No preprocessed echo images found; nothing to do");
        return Ok(BatchPlan {
            out_root,
            rows: Vec::new(),
        });
    }

    let raw_dir = config.raw_data_dir();
    let raw_files = discovery::discover_files(&raw_dir, config.max_depth).await?;
    let sidecar_files =
        discovery::collect_echo_files(&raw_files, EchoFileKind::RawSidecar, config.skip_invalid)?;
    tracing::info!(
        raw_dir = %raw_dir.display(),
        sidecars = sidecar_files.len(),
        "Scanned raw sidecars",
    );

    let wanted = acquisition::acquisition_keys(&images);
    let sidecars = acquisition::load_sidecars(sidecar_files, &wanted).await?;
    let rows = acquisition::build_table(images, &sidecars, &out_root)?;

    let conflicts = acquisition::detect_output_conflicts(&rows);
    if !conflicts.is_empty() {
        return Err(PipelineError::OutputConflict(conflicts));
    }

    tracing::info!(
        acquisitions = rows.len(),
        out_root = %out_root.display(),
        "Batch planned",
    );
    Ok(BatchPlan { out_root, rows })
}
