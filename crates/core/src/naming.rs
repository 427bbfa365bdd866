//! BIDS echo filename convention engine.
//!
//! Parses multi-echo filenames of the form
//! `sub-<label>[_<key>-<label>...]_echo-<n>_<tail>` and derives the
//! deterministic output locations and prefixes used for each acquisition.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EchoIndex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Marker separating the acquisition key from the echo entity.
pub const ECHO_MARKER: &str = "_echo-";

/// Tail of a preprocessed echo image written by fMRIPrep with
/// `--me-output-echoes`.
pub const PREPROC_IMAGE_TAIL: &str = "desc-preproc_bold.nii.gz";

/// Tail of a raw BIDS echo sidecar.
pub const SIDECAR_TAIL: &str = "bold.json";

/// Filename endings worth parsing at all.
pub const CANDIDATE_SUFFIXES: &[&str] = &["_bold.nii.gz", "_bold.nii", "_bold.json"];

/// Space label appended to every output prefix.
pub const OUTPUT_SPACE: &str = "space-Native";

/// Directory created next to the fMRIPrep directory to hold all outputs.
pub const OUTPUT_DIR_NAME: &str = "tedana";

const SUBJECT_KEY: &str = "sub";
const TASK_KEY: &str = "task";

static ECHO_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<acq>.+?)_echo-(?P<echo>[0-9]+)_(?P<tail>.+)$").expect("valid regex")
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<key>[a-zA-Z]+)-(?P<label>[a-zA-Z0-9]+)$").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One `key-label` pair of a BIDS filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidsEntity {
    pub key: String,
    pub label: String,
}

impl fmt::Display for BidsEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.key, self.label)
    }
}

/// A parsed echo filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoFileName {
    /// Everything before `_echo-<n>` (e.g. `sub-01_task-rest_run-1`).
    pub acquisition: String,
    /// Entities of the acquisition key, in filename order.
    pub entities: Vec<BidsEntity>,
    /// Subject entity, e.g. `sub-01`.
    pub subject: String,
    /// Task entity, e.g. `task-rest`.
    pub task: String,
    /// Echo number.
    pub echo: EchoIndex,
    /// Everything after `_echo-<n>_` (e.g. `desc-preproc_bold.nii.gz`).
    pub tail: String,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Returns `true` if the file name looks like an echo image or sidecar.
///
/// This is a cheap pre-filter; candidates still have to pass
/// [`parse_echo_file_name`].
pub fn is_echo_candidate(file_name: &str) -> bool {
    file_name.contains(ECHO_MARKER)
        && CANDIDATE_SUFFIXES
            .iter()
            .any(|suffix| file_name.ends_with(suffix))
}

/// Parse an echo filename into its acquisition key, entities and echo number.
///
/// # Examples
///
/// ```
/// use mebatch_core::naming::parse_echo_file_name;
///
/// let parsed = parse_echo_file_name("sub-01_task-rest_run-1_echo-2_desc-preproc_bold.nii.gz").unwrap();
/// assert_eq!(parsed.acquisition, "sub-01_task-rest_run-1");
/// assert_eq!(parsed.subject, "sub-01");
/// assert_eq!(parsed.task, "task-rest");
/// assert_eq!(parsed.echo, 2);
/// ```
pub fn parse_echo_file_name(file_name: &str) -> Result<EchoFileName, CoreError> {
    let caps = ECHO_FILE_RE.captures(file_name).ok_or_else(|| {
        CoreError::Validation(format!(
            "'{file_name}' does not match <entities>_echo-<n>_<suffix>"
        ))
    })?;

    let acquisition = caps["acq"].to_string();
    let echo: EchoIndex = caps["echo"].parse().map_err(|_| {
        CoreError::Validation(format!("'{file_name}' has an out-of-range echo number"))
    })?;
    let entities =
        parse_entities(&acquisition).map_err(|e| prefix_validation(file_name, e))?;

    let subject = find_entity(&entities, SUBJECT_KEY).ok_or_else(|| {
        CoreError::Validation(format!("'{file_name}' has no sub-<label> entity"))
    })?;
    if entities[0].key != SUBJECT_KEY {
        return Err(CoreError::Validation(format!(
            "'{file_name}' must start with the sub-<label> entity"
        )));
    }
    let task = find_entity(&entities, TASK_KEY).ok_or_else(|| {
        CoreError::Validation(format!("'{file_name}' has no task-<label> entity"))
    })?;

    Ok(EchoFileName {
        subject: subject.to_string(),
        task: task.to_string(),
        acquisition,
        entities,
        echo,
        tail: caps["tail"].to_string(),
    })
}

/// Text after `_echo-<n>_`, without validating the entities before it.
///
/// `sub-01_task-rest_echo-1_desc-preproc_bold.json` has the tail
/// `desc-preproc_bold.json`.
pub fn echo_tail(file_name: &str) -> Option<&str> {
    ECHO_FILE_RE
        .captures(file_name)
        .and_then(|caps| caps.name("tail"))
        .map(|m| m.as_str())
}

/// Split an acquisition key into its `key-label` entities.
///
/// Every segment must be a well-formed entity and no key may repeat.
pub fn parse_entities(acquisition: &str) -> Result<Vec<BidsEntity>, CoreError> {
    let mut entities: Vec<BidsEntity> = Vec::new();

    for segment in acquisition.split('_') {
        let caps = ENTITY_RE.captures(segment).ok_or_else(|| {
            CoreError::Validation(format!("malformed entity '{segment}'"))
        })?;
        let key = &caps["key"];
        if entities.iter().any(|e| e.key == key) {
            return Err(CoreError::Validation(format!("duplicate entity '{key}'")));
        }
        entities.push(BidsEntity {
            key: key.to_string(),
            label: caps["label"].to_string(),
        });
    }

    Ok(entities)
}

// ---------------------------------------------------------------------------
// Output naming
// ---------------------------------------------------------------------------

/// Build the tedana output prefix for an acquisition.
///
/// Convention: `{sub}_{task}{_other entities}_space-Native`, keeping any
/// session, run or acquisition entity so that repeated runs of one task
/// do not collide inside the shared output directory.
pub fn tedana_prefix(entities: &[BidsEntity]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(entities.len() + 1);

    for key in [SUBJECT_KEY, TASK_KEY] {
        if let Some(entity) = entities.iter().find(|e| e.key == key) {
            parts.push(entity.to_string());
        }
    }
    parts.extend(
        entities
            .iter()
            .filter(|e| e.key != SUBJECT_KEY && e.key != TASK_KEY)
            .map(BidsEntity::to_string),
    );
    parts.push(OUTPUT_SPACE.to_string());

    parts.join("_")
}

/// Output directory for one subject/task: `{out_root}/{subject}/{task}`.
pub fn derive_out_dir(out_root: &Path, subject: &str, task: &str) -> PathBuf {
    out_root.join(subject).join(task)
}

/// Default output root: a `tedana` directory next to the fMRIPrep directory.
pub fn default_out_root(fmriprep_dir: &Path) -> Result<PathBuf, CoreError> {
    let absolute =
        std::path::absolute(fmriprep_dir).map_err(|e| CoreError::io(fmriprep_dir, e))?;
    let parent = absolute.parent().ok_or_else(|| {
        CoreError::Validation(format!(
            "{} has no parent directory to hold outputs",
            absolute.display()
        ))
    })?;
    Ok(parent.join(OUTPUT_DIR_NAME))
}

// ── Private helpers ──────────────────────────────────────────────────

fn find_entity(entities: &[BidsEntity], key: &str) -> Option<String> {
    entities
        .iter()
        .find(|e| e.key == key)
        .map(BidsEntity::to_string)
}

fn prefix_validation(file_name: &str, err: CoreError) -> CoreError {
    match err {
        CoreError::Validation(msg) => CoreError::Validation(format!("'{file_name}': {msg}")),
        other => other,
    }
}
