use std::io;
use thiserror::Error;

use architect_utils::types::{ArtifactType, ErrorKind};

/// Errors raised by version stores.
#[derive(Error, Debug)]
pub enum VersioningError {
    #[error(
        "Version conflict for '{artifact}': expected latest {}, found {}",
        fmt_version(*.expected),
        fmt_version(*.actual)
    )]
    Conflict {
        artifact: ArtifactType,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("Version {version} of '{artifact}' not found")]
    NotFound { artifact: ArtifactType, version: u64 },

    #[error("Version store path is not valid UTF-8: {path}")]
    InvalidPath { path: String },

    #[error("Failed to acquire version lock {path}: {reason}")]
    Lock { path: String, reason: String },

    #[error("Failed to persist version index {path}: {reason}")]
    Persist { path: String, reason: String },

    #[error("Version index is corrupted: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error in version store: {0}")]
    Io(#[from] io::Error),
}

fn fmt_version(v: Option<u64>) -> String {
    v.map_or_else(|| "none".to_string(), |v| format!("v{v}"))
}

impl VersioningError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict { .. } => ErrorKind::VersioningConflict,
            // Asking for a version that was never assigned is a caller mistake.
            Self::NotFound { .. } => ErrorKind::Configuration,
            _ => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message() {
        let err = VersioningError::Conflict {
            artifact: ArtifactType::Erd,
            expected: None,
            actual: Some(4),
        };
        assert_eq!(
            err.to_string(),
            "Version conflict for 'erd': expected latest none, found v4"
        );
        assert_eq!(err.kind(), ErrorKind::VersioningConflict);
    }

    #[test]
    fn test_not_found_is_configuration() {
        let err = VersioningError::NotFound {
            artifact: ArtifactType::Class,
            version: 9,
        };
        assert!(!err.is_conflict());
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let io = VersioningError::Io(std::io::Error::other("disk full"));
        assert_eq!(io.kind(), ErrorKind::Internal);
    }
}
