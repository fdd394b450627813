//! Commit and restore rules shared by every store.
//!
//! Callers hold the per-artifact lock for the duration of each function.

use chrono::Utc;

use crate::error::VersioningError;
use crate::record::{CommitOutcome, VersionMetadata, VersionRecord};
use architect_utils::hashing::content_hash;
use architect_utils::types::ArtifactType;

pub(crate) fn latest(records: &[VersionRecord]) -> Option<u64> {
    records.iter().map(|r| r.version).max()
}

pub(crate) fn current(records: &[VersionRecord]) -> Option<&VersionRecord> {
    records.iter().find(|r| r.is_current)
}

/// Append `content` unless it matches the current version.
///
/// Fails with `Conflict` when the history moved past `expected_latest`.
pub(crate) fn commit(
    records: &mut Vec<VersionRecord>,
    artifact: ArtifactType,
    expected_latest: Option<u64>,
    content: &str,
    metadata: VersionMetadata,
) -> Result<CommitOutcome, VersioningError> {
    let hash = content_hash(content);
    if let Some(cur) = current(records)
        && cur.content_hash == hash
    {
        return Ok(CommitOutcome::Unchanged {
            version: cur.version,
        });
    }

    let actual = latest(records);
    if actual != expected_latest {
        return Err(VersioningError::Conflict {
            artifact,
            expected: expected_latest,
            actual,
        });
    }

    let version = actual.map_or(1, |v| v + 1);
    for record in records.iter_mut() {
        record.is_current = false;
    }
    records.push(VersionRecord {
        artifact,
        version,
        content: content.to_string(),
        content_hash: hash,
        is_current: true,
        created_at: Utc::now(),
        metadata,
    });
    Ok(CommitOutcome::Created { version })
}

/// Make `version` the current record.
pub(crate) fn restore(
    records: &mut [VersionRecord],
    artifact: ArtifactType,
    version: u64,
) -> Result<VersionRecord, VersioningError> {
    if !records.iter().any(|r| r.version == version) {
        return Err(VersioningError::NotFound { artifact, version });
    }
    let mut restored = None;
    for record in records.iter_mut() {
        record.is_current = record.version == version;
        if record.is_current {
            restored = Some(record.clone());
        }
    }
    restored.ok_or(VersioningError::NotFound { artifact, version })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_new(records: &mut Vec<VersionRecord>, content: &str) -> CommitOutcome {
        let expected = latest(records);
        commit(records, ArtifactType::Erd, expected, content, VersionMetadata::default()).unwrap()
    }

    #[test]
    fn test_versions_start_at_one_and_increase() {
        let mut records = Vec::new();
        assert_eq!(commit_new(&mut records, "a"), CommitOutcome::Created { version: 1 });
        assert_eq!(commit_new(&mut records, "b"), CommitOutcome::Created { version: 2 });
        assert_eq!(records.iter().filter(|r| r.is_current).count(), 1);
        assert_eq!(current(&records).unwrap().version, 2);
    }

    #[test]
    fn test_identical_content_is_not_reversioned() {
        let mut records = Vec::new();
        commit_new(&mut records, "erDiagram\r\nA { int id }");
        let outcome = commit_new(&mut records, "erDiagram\nA { int id }");
        assert_eq!(outcome, CommitOutcome::Unchanged { version: 1 });
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_dedup_only_against_current() {
        let mut records = Vec::new();
        commit_new(&mut records, "a");
        commit_new(&mut records, "b");
        assert_eq!(commit_new(&mut records, "a"), CommitOutcome::Created { version: 3 });
    }

    #[test]
    fn test_stale_expectation_conflicts() {
        let mut records = Vec::new();
        commit_new(&mut records, "a");
        let err = commit(&mut records, ArtifactType::Erd, None, "b", VersionMetadata::default())
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_restore_moves_current_flag() {
        let mut records = Vec::new();
        commit_new(&mut records, "a");
        commit_new(&mut records, "b");
        let restored = restore(&mut records, ArtifactType::Erd, 1).unwrap();
        assert!(restored.is_current);
        assert_eq!(restored.content, "a");
        assert_eq!(records.iter().filter(|r| r.is_current).count(), 1);

        // Restoring does not renumber; the next commit still goes past the max.
        assert_eq!(commit_new(&mut records, "c"), CommitOutcome::Created { version: 3 });
    }

    #[test]
    fn test_restore_unknown_version() {
        let mut records = Vec::new();
        commit_new(&mut records, "a");
        assert!(matches!(
            restore(&mut records, ArtifactType::Erd, 7),
            Err(VersioningError::NotFound { version: 7, .. })
        ));
        assert!(records[0].is_current);
    }
}
