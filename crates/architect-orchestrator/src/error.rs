use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Attempt;
use architect_utils::types::{ArtifactType, ErrorKind, UnknownArtifactType};
use architect_versioning::VersioningError;

/// Terminal failures of a generation request.
///
/// Per-attempt failures never appear here; they are recorded on the
/// [`Attempt`] and the controller moves on.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Unknown artifact type '{tag}'")]
    UnknownArtifactType { tag: String },

    #[error("Generation exhausted for '{artifact}': no usable output after {} attempt(s)", attempts.len())]
    GenerationExhausted {
        artifact: ArtifactType,
        attempts: Vec<Attempt>,
    },

    /// The output was accepted but could not be committed.
    #[error("Versioning failed: {source}")]
    Versioning {
        source: VersioningError,
        attempts: Vec<Attempt>,
    },

    #[error("Generation cancelled after {} attempt(s)", attempts.len())]
    Cancelled { attempts: Vec<Attempt> },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<UnknownArtifactType> for GenerationError {
    fn from(e: UnknownArtifactType) -> Self {
        Self::UnknownArtifactType { tag: e.tag }
    }
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownArtifactType { .. } => ErrorKind::UnknownArtifactType,
            Self::GenerationExhausted { .. } => ErrorKind::GenerationExhausted,
            Self::Versioning { source, .. } => source.kind(),
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Attempt history attached to the failure, if any.
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Self::GenerationExhausted { attempts, .. }
            | Self::Versioning { attempts, .. }
            | Self::Cancelled { attempts } => attempts,
            _ => &[],
        }
    }

    pub fn to_report(&self) -> FailureReport {
        FailureReport {
            kind: self.kind(),
            message: self.to_string(),
            attempts: self.attempts().to_vec(),
        }
    }
}

/// Structured failure handed to callers instead of a partial artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: ErrorKind,
    pub message: String,
    pub attempts: Vec<Attempt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_version_is_a_configuration_error() {
        let err = GenerationError::Versioning {
            source: VersioningError::NotFound {
                artifact: ArtifactType::Erd,
                version: 9,
            },
            attempts: Vec::new(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().starts_with("Versioning failed: "));
    }

    #[test]
    fn test_report_serializes_kind_snake_case() {
        let err = GenerationError::GenerationExhausted {
            artifact: ArtifactType::Class,
            attempts: Vec::new(),
        };
        let json = serde_json::to_value(err.to_report()).unwrap();
        assert_eq!(json["kind"], "generation_exhausted");
        assert_eq!(
            json["message"],
            "Generation exhausted for 'class': no usable output after 0 attempt(s)"
        );
    }
}
