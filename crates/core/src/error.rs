use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {entity} {name}")]
    NotFound { entity: &'static str, name: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid sidecar {}: {reason}", path.display())]
    Sidecar { path: PathBuf, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Wrap an I/O error together with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = CoreError::NotFound {
            entity: "sidecar",
            name: "sub-01_task-rest_echo-2".to_string(),
        };
        assert_eq!(err.to_string(), "Not found: sidecar sub-01_task-rest_echo-2");
    }

    #[test]
    fn display_sidecar() {
        let err = CoreError::Sidecar {
            path: PathBuf::from("/data/sub-01_echo-1_bold.json"),
            reason: "missing EchoTime".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid sidecar /data/sub-01_echo-1_bold.json: missing EchoTime"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        let err = CoreError::io("/nowhere", std::io::Error::other("boom"));
        assert!(err.to_string().starts_with("I/O error at /nowhere"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
