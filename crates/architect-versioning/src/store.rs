use tracing::{debug, warn};

use crate::error::VersioningError;
use crate::record::{CommitOutcome, VersionMetadata, VersionRecord};
use architect_utils::types::ArtifactType;

/// Persistence for artifact version history.
///
/// Implementations serialize mutations per artifact type; different artifact
/// types never contend.
pub trait VersionStore: Send + Sync {
    /// Highest version number ever assigned, `None` when there is no history.
    fn latest_version(&self, artifact: ArtifactType) -> Result<Option<u64>, VersioningError>;

    /// Compare-and-swap append.
    ///
    /// Returns `Unchanged` when `content` matches the current record. Fails
    /// with [`VersioningError::Conflict`] when the latest version is not
    /// `expected_latest`.
    fn commit(
        &self,
        artifact: ArtifactType,
        expected_latest: Option<u64>,
        content: &str,
        metadata: VersionMetadata,
    ) -> Result<CommitOutcome, VersioningError>;

    fn get_current(&self, artifact: ArtifactType) -> Result<Option<VersionRecord>, VersioningError>;

    /// Full history, oldest first.
    fn list(&self, artifact: ArtifactType) -> Result<Vec<VersionRecord>, VersioningError>;

    /// Make an existing version current again.
    fn restore(&self, artifact: ArtifactType, version: u64) -> Result<VersionRecord, VersioningError>;
}

/// Append with optimistic retry.
///
/// Reads the latest version, commits against it, and on conflict re-reads and
/// tries again up to `max_retries` more times before giving up.
pub fn append_version(
    store: &dyn VersionStore,
    artifact: ArtifactType,
    content: &str,
    metadata: VersionMetadata,
    max_retries: u32,
) -> Result<CommitOutcome, VersioningError> {
    let mut retries = 0;
    loop {
        let expected = store.latest_version(artifact)?;
        match store.commit(artifact, expected, content, metadata.clone()) {
            Ok(outcome) => {
                debug!(
                    artifact = %artifact,
                    version = outcome.version(),
                    created = outcome.is_created(),
                    retries = retries,
                    "Committed version"
                );
                return Ok(outcome);
            }
            Err(e) if e.is_conflict() && retries < max_retries => {
                retries += 1;
                debug!(artifact = %artifact, retry = retries, error = %e, "Retrying version commit");
            }
            Err(e) => {
                if e.is_conflict() {
                    warn!(artifact = %artifact, retries = retries, "Version commit retries exhausted");
                }
                return Err(e);
            }
        }
    }
}
