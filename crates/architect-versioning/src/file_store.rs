//! JSON-file version store
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<artifact>.json   version index, replaced atomically
//! <root>/<artifact>.lock   advisory lock serializing mutations
//! ```
//!
//! Readers never take the lock: the index is only ever replaced by rename, so
//! a read sees either the previous index or the next one. The lock is advisory
//! and coordinates architect processes; it is not a security boundary.

use camino::{Utf8Path, Utf8PathBuf};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing::debug;

use crate::error::VersioningError;
use crate::history;
use crate::record::{CommitOutcome, VersionMetadata, VersionRecord};
use crate::store::VersionStore;
use architect_utils::atomic_write::write_file_atomic;
use architect_utils::types::ArtifactType;

const INDEX_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct VersionIndex {
    schema_version: u32,
    artifact: ArtifactType,
    versions: Vec<VersionRecord>,
}

/// Version store persisted as one JSON index per artifact type.
#[derive(Debug, Clone)]
pub struct FileVersionStore {
    root: Utf8PathBuf,
}

impl FileVersionStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, VersioningError> {
        let root = Utf8PathBuf::from_path_buf(root.to_path_buf()).map_err(|p| {
            VersioningError::InvalidPath {
                path: p.display().to_string(),
            }
        })?;
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn index_path(&self, artifact: ArtifactType) -> Utf8PathBuf {
        self.root.join(format!("{}.json", artifact.as_str()))
    }

    fn lock_path(&self, artifact: ArtifactType) -> Utf8PathBuf {
        self.root.join(format!("{}.lock", artifact.as_str()))
    }

    fn load(&self, artifact: ArtifactType) -> Result<Vec<VersionRecord>, VersioningError> {
        let path = self.index_path(artifact);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let index: VersionIndex = serde_json::from_str(&raw)?;
        Ok(index.versions)
    }

    fn save(&self, artifact: ArtifactType, versions: Vec<VersionRecord>) -> Result<(), VersioningError> {
        let path = self.index_path(artifact);
        let index = VersionIndex {
            schema_version: INDEX_SCHEMA_VERSION,
            artifact,
            versions,
        };
        let json = serde_json::to_string_pretty(&index)?;
        write_file_atomic(&path, &json).map_err(|e| VersioningError::Persist {
            path: path.to_string(),
            reason: format!("{e:#}"),
        })?;
        Ok(())
    }

    /// Run `mutate` on the artifact's history under its exclusive lock and
    /// persist the result if it succeeds.
    fn locked<T>(
        &self,
        artifact: ArtifactType,
        mutate: impl FnOnce(&mut Vec<VersionRecord>) -> Result<(T, bool), VersioningError>,
    ) -> Result<T, VersioningError> {
        let lock_path = self.lock_path(artifact);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        let mut lock = RwLock::new(lock_file);
        let _guard = lock.write().map_err(|e| VersioningError::Lock {
            path: lock_path.to_string(),
            reason: e.to_string(),
        })?;

        let mut records = self.load(artifact)?;
        let (value, dirty) = mutate(&mut records)?;
        if dirty {
            self.save(artifact, records)?;
        }
        Ok(value)
    }
}

impl VersionStore for FileVersionStore {
    fn latest_version(&self, artifact: ArtifactType) -> Result<Option<u64>, VersioningError> {
        Ok(history::latest(&self.load(artifact)?))
    }

    fn commit(
        &self,
        artifact: ArtifactType,
        expected_latest: Option<u64>,
        content: &str,
        metadata: VersionMetadata,
    ) -> Result<CommitOutcome, VersioningError> {
        let outcome = self.locked(artifact, |records| {
            let outcome = history::commit(records, artifact, expected_latest, content, metadata)?;
            Ok((outcome, outcome.is_created()))
        })?;
        debug!(artifact = %artifact, root = %self.root, ?outcome, "Version index updated");
        Ok(outcome)
    }

    fn get_current(&self, artifact: ArtifactType) -> Result<Option<VersionRecord>, VersioningError> {
        Ok(history::current(&self.load(artifact)?).cloned())
    }

    fn list(&self, artifact: ArtifactType) -> Result<Vec<VersionRecord>, VersioningError> {
        let mut records = self.load(artifact)?;
        records.sort_by_key(|r| r.version);
        Ok(records)
    }

    fn restore(&self, artifact: ArtifactType, version: u64) -> Result<VersionRecord, VersioningError> {
        self.locked(artifact, |records| {
            let restored = history::restore(records, artifact, version)?;
            Ok((restored, true))
        })
    }
}
