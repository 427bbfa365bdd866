//! BIDS JSON sidecar reading.
//!
//! Only the `EchoTime` field is needed; every other key of the sidecar is
//! ignored.

use std::path::Path;

use serde::Deserialize;

use crate::error::CoreError;
use crate::types::EchoTimeSecs;

/// The subset of a BOLD sidecar the batch needs.
#[derive(Debug, Deserialize)]
pub struct BoldSidecar {
    #[serde(rename = "EchoTime")]
    pub echo_time: Option<EchoTimeSecs>,
}

/// Parse sidecar JSON text and return its echo time in seconds.
pub fn parse_echo_time(path: &Path, contents: &str) -> Result<EchoTimeSecs, CoreError> {
    let sidecar: BoldSidecar =
        serde_json::from_str(contents).map_err(|e| CoreError::Sidecar {
            path: path.to_path_buf(),
            reason: format!("malformed JSON: {e}"),
        })?;

    let echo_time = sidecar.echo_time.ok_or_else(|| CoreError::Sidecar {
        path: path.to_path_buf(),
        reason: "missing EchoTime".to_string(),
    })?;

    if !echo_time.is_finite() || echo_time <= 0.0 {
        return Err(CoreError::Sidecar {
            path: path.to_path_buf(),
            reason: format!("EchoTime must be a positive number, got {echo_time}"),
        });
    }

    Ok(echo_time)
}

/// Read a sidecar from disk and return its echo time in seconds.
pub async fn read_echo_time(path: &Path) -> Result<EchoTimeSecs, CoreError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CoreError::Sidecar {
            path: path.to_path_buf(),
            reason: format!("cannot read: {e}"),
        })?;
    parse_echo_time(path, &contents)
}
