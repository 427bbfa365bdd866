//! Directory walking and echo file classification.
//!
//! Walks a derivatives or raw-data tree, keeps every regular file, and
//! turns the echo candidates of one kind into parsed [`EchoFile`]s.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::naming::{self, EchoFileName, PREPROC_IMAGE_TAIL, SIDECAR_TAIL};

// ── Constants ────────────────────────────────────────────────────────

/// Maximum folder nesting depth before the walker stops recursing.
///
/// A BIDS tree is `sub/ses/func`, so this leaves generous headroom.
pub const MAX_FOLDER_DEPTH: usize = 10;

// ── Types ────────────────────────────────────────────────────────────

/// A regular file found while walking a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// Path relative to the walk root (e.g. `sub-01/func/x.json`).
    pub relative_path: String,
    /// Just the file name.
    pub file_name: String,
    /// Nesting depth (0 = file directly in root).
    pub depth: usize,
}

/// What an echo file is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoFileKind {
    /// Preprocessed per-echo image from fMRIPrep.
    PreprocImage,
    /// Raw BIDS sidecar holding `EchoTime`.
    RawSidecar,
    Other,
}

impl EchoFileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreprocImage => "preproc_image",
            Self::RawSidecar => "raw_sidecar",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EchoFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered file whose name parsed as an echo file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoFile {
    pub path: PathBuf,
    pub name: EchoFileName,
}

// ── Pure functions ───────────────────────────────────────────────────

/// Classify an echo candidate by the part of its name after `_echo-<n>_`.
///
/// The tail must match exactly, so derivative sidecars such as
/// `..._echo-1_desc-preproc_bold.json` are never taken for raw ones.
pub fn classify(file_name: &str) -> EchoFileKind {
    if !naming::is_echo_candidate(file_name) {
        return EchoFileKind::Other;
    }
    match naming::echo_tail(file_name) {
        Some(PREPROC_IMAGE_TAIL) => EchoFileKind::PreprocImage,
        Some(SIDECAR_TAIL) => EchoFileKind::RawSidecar,
        _ => EchoFileKind::Other,
    }
}

/// Returns `true` if the file name represents a hidden or system file.
pub fn is_hidden_or_system(file_name: &str) -> bool {
    file_name.starts_with('.')
        || file_name == "Thumbs.db"
        || file_name == "desktop.ini"
        || file_name == ".DS_Store"
}

/// Parse every discovered file of the requested kind.
///
/// A candidate whose name does not parse is an error, unless
/// `skip_invalid` is set, in which case it is logged and dropped.
pub fn collect_echo_files(
    files: &[DiscoveredFile],
    kind: EchoFileKind,
    skip_invalid: bool,
) -> Result<Vec<EchoFile>, CoreError> {
    let mut echo_files = Vec::new();

    for file in files.iter().filter(|f| classify(&f.file_name) == kind) {
        match naming::parse_echo_file_name(&file.file_name) {
            Ok(name) => echo_files.push(EchoFile {
                path: file.path.clone(),
                name,
            }),
            Err(err) if skip_invalid => {
                tracing::warn!(
                    path = %file.relative_path,
                    kind = %kind,
                    error = %err,
                    "Skipping file with malformed name",
                );
            }
            Err(err) => return Err(err),
        }
    }

    Ok(echo_files)
}

// ── Walking ──────────────────────────────────────────────────────────

/// Recursively list the regular files below `root`.
///
/// Skips hidden and system entries and anything deeper than `max_depth`.
/// Results are sorted by relative path.
pub async fn discover_files(root: &Path, max_depth: usize) -> Result<Vec<DiscoveredFile>, CoreError> {
    let metadata = tokio::fs::metadata(root)
        .await
        .map_err(|_| CoreError::NotFound {
            entity: "directory",
            name: root.display().to_string(),
        })?;
    if !metadata.is_dir() {
        return Err(CoreError::Validation(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    walk_recursive(root, root, &mut files, 0, max_depth).await?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    tracing::debug!(root = %root.display(), count = files.len(), "Directory walk complete");
    Ok(files)
}

async fn walk_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<DiscoveredFile>,
    depth: usize,
    max_depth: usize,
) -> Result<(), CoreError> {
    if depth > max_depth {
        return Ok(());
    }

    let mut entries = tokio::fs::read_dir(current)
        .await
        .map_err(|e| CoreError::io(current, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CoreError::io(current, e))?
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();

        if is_hidden_or_system(&name) {
            continue;
        }

        let file_type = tokio::fs::metadata(&path)
            .await
            .map_err(|e| CoreError::io(&path, e))?;

        if file_type.is_dir() {
            Box::pin(walk_recursive(root, &path, files, depth + 1, max_depth)).await?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            files.push(DiscoveredFile {
                relative_path: relative.to_string_lossy().to_string(),
                file_name: name,
                path,
                depth,
            });
        }
    }

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
