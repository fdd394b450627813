//! Candidate resolution against swappable routing snapshots

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::error::GenerationError;
use crate::types::Candidate;
use architect_config::Config;
use architect_utils::types::ArtifactType;

/// Ordered candidate lists per artifact type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    entries: BTreeMap<ArtifactType, Vec<Candidate>>,
}

impl RoutingTable {
    /// Table from `[routing.*]`, falling back to the built-in lists.
    pub fn from_config(config: &Config) -> Self {
        let entries = ArtifactType::ALL
            .iter()
            .map(|&artifact| {
                let candidates = config
                    .candidates_for(artifact)
                    .iter()
                    .map(Candidate::from)
                    .collect();
                (artifact, candidates)
            })
            .collect();
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::from_config(&Config::default())
    }

    #[must_use]
    pub fn with_entry(mut self, artifact: ArtifactType, candidates: Vec<Candidate>) -> Self {
        self.entries.insert(artifact, candidates);
        self
    }

    /// Candidates for `artifact`, local tier first, declaration order within a tier.
    pub fn resolve(&self, artifact: ArtifactType) -> Result<Vec<Candidate>, GenerationError> {
        let mut candidates = match self.entries.get(&artifact) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => {
                return Err(GenerationError::UnknownArtifactType {
                    tag: artifact.as_str().to_string(),
                });
            }
        };
        // Stable: ties keep declaration order.
        candidates.sort_by_key(|c| c.tier);
        Ok(candidates)
    }
}

/// Holds the current routing table.
///
/// Readers take an `Arc` snapshot and keep it for the whole request; a
/// refresh installs a new table without touching requests already running.
#[derive(Debug)]
pub struct RoutingRegistry {
    current: RwLock<Arc<RoutingTable>>,
}

impl RoutingRegistry {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    pub fn snapshot(&self) -> Arc<RoutingTable> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Install `table`, returning the one it replaced.
    pub fn swap(&self, table: RoutingTable) -> Arc<RoutingTable> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        info!(artifacts = table.entries.len(), "Routing table replaced");
        std::mem::replace(&mut *current, Arc::new(table))
    }
}

impl Default for RoutingRegistry {
    fn default() -> Self {
        Self::new(RoutingTable::builtin())
    }
}

/// Maps an artifact type to its ordered candidates.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<RoutingRegistry>,
}

impl Resolver {
    pub fn new(registry: Arc<RoutingRegistry>) -> Self {
        Self { registry }
    }

    pub fn from_table(table: RoutingTable) -> Self {
        Self::new(Arc::new(RoutingRegistry::new(table)))
    }

    pub fn registry(&self) -> &Arc<RoutingRegistry> {
        &self.registry
    }

    pub fn resolve(&self, artifact: ArtifactType) -> Result<Vec<Candidate>, GenerationError> {
        let candidates = self.registry.snapshot().resolve(artifact)?;
        debug!(
            artifact = %artifact,
            candidates = ?candidates.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            "Resolved candidates"
        );
        Ok(candidates)
    }

    /// Resolve a raw tag; unknown tags fail with `UnknownArtifactType`.
    pub fn resolve_tag(&self, tag: &str) -> Result<Vec<Candidate>, GenerationError> {
        self.resolve(tag.parse()?)
    }
}
