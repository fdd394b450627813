use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use architect_utils::types::ArtifactType;

/// Provenance attached to a version when it is committed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// `accepted` or `accepted-degraded`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default)]
    pub attempts: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// One historical snapshot of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub artifact: ArtifactType,
    /// Starts at 1, strictly increasing per artifact type
    pub version: u64,
    pub content: String,
    /// blake3 hex digest of the line-ending-normalized content
    pub content_hash: String,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: VersionMetadata,
}

/// Result of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// A new version was appended and made current.
    Created { version: u64 },
    /// Content matched the current version; nothing was written.
    Unchanged { version: u64 },
}

impl CommitOutcome {
    pub fn version(self) -> u64 {
        match self {
            Self::Created { version } | Self::Unchanged { version } => version,
        }
    }

    pub fn is_created(self) -> bool {
        matches!(self, Self::Created { .. })
    }
}
