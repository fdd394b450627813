//! Generation backend abstraction for multi-provider support
//!
//! Every provider implements [`GenerationBackend`], a single capability:
//! take a prompt and a timeout, return text or a typed failure. The
//! orchestrator depends only on this trait and on [`BackendRegistry`], never
//! on concrete provider types.

mod budgeted_backend;
mod gemini_backend;
pub(crate) mod http_client;
mod ollama_backend;
mod openai_compat_backend;
mod registry;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use architect_utils::error::LlmError;
pub use budgeted_backend::BudgetedBackend;
pub use registry::{BackendRegistry, UnavailableBackend};
pub use types::{BackendOutput, GenerationBackend, Invocation};
