//! Generation orchestration: resolve candidates, run them one at a time,
//! score each output, and fall back until one passes or the budget runs out.
//!
//! ```text
//! request -> Resolver -> [Executor -> Validator]* -> Controller -> VersionStore
//! ```
//!
//! Candidates for one request are strictly sequential. Many requests can run
//! concurrently against a shared [`Controller`].

mod controller;
mod error;
mod events;
mod executor;
mod resolver;
mod types;

pub use controller::{Controller, ControllerState};
pub use error::{FailureReport, GenerationError};
pub use events::{CollectingSink, EventSink, GenerationEvent, NoopSink};
pub use executor::Executor;
pub use resolver::{Resolver, RoutingRegistry, RoutingTable};
pub use types::{Attempt, Candidate, GenerationRequest, GenerationResult, GenerationStatus};

pub use tokio_util::sync::CancellationToken;
