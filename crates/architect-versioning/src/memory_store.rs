use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::VersioningError;
use crate::history;
use crate::record::{CommitOutcome, VersionMetadata, VersionRecord};
use crate::store::VersionStore;
use architect_utils::types::ArtifactType;

/// Process-local store, used by tests and by callers that persist elsewhere.
#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    histories: Mutex<HashMap<ArtifactType, Vec<VersionRecord>>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn histories(&self) -> MutexGuard<'_, HashMap<ArtifactType, Vec<VersionRecord>>> {
        // Every mutation leaves the map consistent, so a poisoned lock is still usable.
        self.histories.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VersionStore for InMemoryVersionStore {
    fn latest_version(&self, artifact: ArtifactType) -> Result<Option<u64>, VersioningError> {
        Ok(self
            .histories()
            .get(&artifact)
            .and_then(|records| history::latest(records)))
    }

    fn commit(
        &self,
        artifact: ArtifactType,
        expected_latest: Option<u64>,
        content: &str,
        metadata: VersionMetadata,
    ) -> Result<CommitOutcome, VersioningError> {
        let mut histories = self.histories();
        let records = histories.entry(artifact).or_default();
        history::commit(records, artifact, expected_latest, content, metadata)
    }

    fn get_current(&self, artifact: ArtifactType) -> Result<Option<VersionRecord>, VersioningError> {
        Ok(self
            .histories()
            .get(&artifact)
            .and_then(|records| history::current(records).cloned()))
    }

    fn list(&self, artifact: ArtifactType) -> Result<Vec<VersionRecord>, VersioningError> {
        Ok(self.histories().get(&artifact).cloned().unwrap_or_default())
    }

    fn restore(&self, artifact: ArtifactType, version: u64) -> Result<VersionRecord, VersioningError> {
        let mut histories = self.histories();
        let records = histories.entry(artifact).or_default();
        history::restore(records, artifact, version)
    }
}
