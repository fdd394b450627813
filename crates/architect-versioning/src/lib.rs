//! Append-only version history per artifact type
//!
//! Every accepted generation becomes a [`VersionRecord`]. Versions are
//! numbered from 1 per artifact type, identical content is not re-versioned,
//! and exactly one record per artifact type is current. Stores serialize
//! commits per artifact type and expose a compare-and-swap [`VersionStore::commit`];
//! [`append_version`] wraps it in a bounded optimistic retry loop.

mod error;
mod file_store;
mod history;
mod memory_store;
mod record;
mod store;

pub use error::VersioningError;
pub use file_store::FileVersionStore;
pub use memory_store::InMemoryVersionStore;
pub use record::{CommitOutcome, VersionMetadata, VersionRecord};
pub use store::{VersionStore, append_version};
