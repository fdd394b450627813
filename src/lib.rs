//! architect - artifact generation with model fallback, scoring and versioning
//!
//! A request names an artifact type (`erd`, `sequence`, `api_docs`, ...) and
//! carries an opaque prompt. The orchestrator resolves an ordered list of
//! candidate backends, runs them one at a time, scores every output with a
//! rule-driven validator, and keeps going until one clears the threshold.
//! The accepted (or best degraded) output is committed to an append-only
//! version store.
//!
//! # Library use
//!
//! ```no_run
//! use std::sync::Arc;
//! use architect::{
//!     BackendRegistry, Config, Controller, GenerationRequest, InMemoryVersionStore,
//! };
//! use architect::types::ArtifactType;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let controller = Controller::from_config(
//!     &config,
//!     BackendRegistry::from_config(&config),
//!     Arc::new(InMemoryVersionStore::new()),
//! );
//! let result = controller
//!     .generate(GenerationRequest::new(ArtifactType::Erd, "Users place orders"))
//!     .await?;
//! println!("v{} scored {}", result.version(), result.attempts()[0].score);
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use architect_config::{CliArgs, Config, ConfigSource};
pub use architect_llm::{BackendOutput, BackendRegistry, GenerationBackend, Invocation, LlmError};
pub use architect_orchestrator::{
    Attempt, CancellationToken, Candidate, CollectingSink, Controller, ControllerState, EventSink,
    Executor, FailureReport, GenerationError, GenerationEvent, GenerationRequest, GenerationResult,
    GenerationStatus, NoopSink, Resolver, RoutingRegistry, RoutingTable,
};
pub use architect_utils::error::{ArchitectError, ConfigError};
pub use architect_utils::exit_codes::ExitCode;
pub use architect_utils::types;
pub use architect_validation::{OutputValidator, ValidationReport, default_threshold};
pub use architect_versioning::{
    CommitOutcome, FileVersionStore, InMemoryVersionStore, VersionMetadata, VersionRecord,
    VersionStore, VersioningError, append_version,
};

/// Deterministic backends for tests (feature `test-utils`).
#[cfg(feature = "test-utils")]
pub use architect_llm::testing;
