//! The acquisition table: one row per multi-echo acquisition.
//!
//! Pure grouping and pairing logic plus a small async loader for the
//! sidecars the table needs. Rows carry index-aligned echo files and
//! echo times sorted by ascending echo time.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discovery::EchoFile;
use crate::error::CoreError;
use crate::naming::{self, BidsEntity};
use crate::sidecar;
use crate::types::{EchoIndex, EchoTimeSecs};

/// Fewest echoes a decomposition can work with.
pub const MIN_ECHOES: usize = 2;

// ── Types ────────────────────────────────────────────────────────────

/// A raw sidecar together with the echo time read from it.
#[derive(Debug, Clone)]
pub struct SidecarEcho {
    pub file: EchoFile,
    pub echo_time: EchoTimeSecs,
}

/// One subject/task acquisition ready to be decomposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRow {
    /// Acquisition key shared by all echoes (e.g. `sub-01_task-rest_run-1`).
    pub acquisition: String,
    pub subject: String,
    pub task: String,
    pub entities: Vec<BidsEntity>,
    /// Echo numbers, index-aligned with `echo_files`.
    pub echoes: Vec<EchoIndex>,
    pub echo_files: Vec<PathBuf>,
    /// Echo times in seconds, strictly ascending.
    pub echo_times: Vec<EchoTimeSecs>,
    pub out_dir: PathBuf,
    pub prefix: String,
}

/// Several acquisitions that would write to the same outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConflict {
    pub out_dir: PathBuf,
    pub prefix: String,
    pub acquisitions: Vec<String>,
}

// ── Loading ──────────────────────────────────────────────────────────

/// Distinct acquisition keys of a set of echo files.
pub fn acquisition_keys(files: &[EchoFile]) -> BTreeSet<String> {
    files.iter().map(|f| f.name.acquisition.clone()).collect()
}

/// Read the echo time of every sidecar belonging to one of `wanted`.
///
/// Sidecars of acquisitions without preprocessed images are never opened.
pub async fn load_sidecars(
    sidecars: Vec<EchoFile>,
    wanted: &BTreeSet<String>,
) -> Result<Vec<SidecarEcho>, CoreError> {
    let mut loaded = Vec::new();

    for file in sidecars
        .into_iter()
        .filter(|f| wanted.contains(&f.name.acquisition))
    {
        let echo_time = sidecar::read_echo_time(&file.path).await?;
        tracing::debug!(
            acquisition = %file.name.acquisition,
            echo = file.name.echo,
            echo_time,
            "Read echo time",
        );
        loaded.push(SidecarEcho { file, echo_time });
    }

    Ok(loaded)
}

// ── Table building ───────────────────────────────────────────────────

/// Group preprocessed echo images into acquisition rows.
///
/// Each image is paired with the sidecar that has the same acquisition key
/// and echo number. Rows are ordered by acquisition key.
pub fn build_table(
    images: Vec<EchoFile>,
    sidecars: &[SidecarEcho],
    out_root: &Path,
) -> Result<Vec<AcquisitionRow>, CoreError> {
    let mut grouped: BTreeMap<String, BTreeMap<EchoIndex, EchoFile>> = BTreeMap::new();
    for image in images {
        let echoes = grouped.entry(image.name.acquisition.clone()).or_default();
        if let Some(existing) = echoes.get(&image.name.echo) {
            return Err(CoreError::Conflict(format!(
                "echo {} of {} has two images: {} and {}",
                image.name.echo,
                image.name.acquisition,
                existing.path.display(),
                image.path.display()
            )));
        }
        echoes.insert(image.name.echo, image);
    }

    let mut by_echo: HashMap<(&str, EchoIndex), &SidecarEcho> = HashMap::new();
    for sidecar in sidecars {
        let key = (sidecar.file.name.acquisition.as_str(), sidecar.file.name.echo);
        if let Some(existing) = by_echo.insert(key, sidecar) {
            return Err(CoreError::Conflict(format!(
                "echo {} of {} has two sidecars: {} and {}",
                key.1,
                key.0,
                existing.file.path.display(),
                sidecar.file.path.display()
            )));
        }
    }

    grouped
        .into_iter()
        .map(|(acquisition, echoes)| build_row(acquisition, echoes, &by_echo, out_root))
        .collect()
}

fn build_row(
    acquisition: String,
    echoes: BTreeMap<EchoIndex, EchoFile>,
    sidecars: &HashMap<(&str, EchoIndex), &SidecarEcho>,
    out_root: &Path,
) -> Result<AcquisitionRow, CoreError> {
    if echoes.len() < MIN_ECHOES {
        return Err(CoreError::Validation(format!(
            "{acquisition} has {} echo image(s), at least {MIN_ECHOES} are required",
            echoes.len()
        )));
    }

    let mut pairs: Vec<(EchoIndex, PathBuf, EchoTimeSecs)> = Vec::with_capacity(echoes.len());
    for (echo, image) in &echoes {
        let sidecar = sidecars
            .get(&(acquisition.as_str(), *echo))
            .ok_or_else(|| CoreError::NotFound {
                entity: "sidecar",
                name: format!("{acquisition}_echo-{echo}"),
            })?;
        pairs.push((*echo, image.path.clone(), sidecar.echo_time));
    }

    // Pairs arrive in echo-number order; echo times decide the final order.
    let echo_order: Vec<EchoIndex> = pairs.iter().map(|p| p.0).collect();
    pairs.sort_by(|a, b| a.2.total_cmp(&b.2));
    if pairs.iter().map(|p| p.0).ne(echo_order.iter().copied()) {
        tracing::warn!(
            acquisition = %acquisition,
            "Echo numbers are not in ascending echo-time order; ordering by echo time",
        );
    }
    if let Some(dup) = pairs.windows(2).find(|w| w[0].2 == w[1].2) {
        return Err(CoreError::Validation(format!(
            "{acquisition}: echoes {} and {} share echo time {}",
            dup[0].0, dup[1].0, dup[0].2
        )));
    }

    let first = echoes
        .values()
        .next()
        .ok_or_else(|| CoreError::Validation(format!("{acquisition} has no echoes")))?;
    let name = &first.name;

    Ok(AcquisitionRow {
        subject: name.subject.clone(),
        task: name.task.clone(),
        entities: name.entities.clone(),
        out_dir: naming::derive_out_dir(out_root, &name.subject, &name.task),
        prefix: naming::tedana_prefix(&name.entities),
        echoes: pairs.iter().map(|p| p.0).collect(),
        echo_files: pairs.iter().map(|p| p.1.clone()).collect(),
        echo_times: pairs.iter().map(|p| p.2).collect(),
        acquisition,
    })
}

/// Detect rows that would write the same output prefix into the same
/// directory.
pub fn detect_output_conflicts(rows: &[AcquisitionRow]) -> Vec<OutputConflict> {
    let mut targets: BTreeMap<(PathBuf, String), Vec<String>> = BTreeMap::new();

    for row in rows {
        targets
            .entry((row.out_dir.clone(), row.prefix.clone()))
            .or_default()
            .push(row.acquisition.clone());
    }

    targets
        .into_iter()
        .filter(|(_, acquisitions)| acquisitions.len() > 1)
        .map(|((out_dir, prefix), acquisitions)| OutputConflict {
            out_dir,
            prefix,
            acquisitions,
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────
