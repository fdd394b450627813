//! Core types for backend abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::LlmError;

/// Input to a backend invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Model to use; empty means the backend default
    pub model: String,
    /// Fully assembled prompt (opaque to this crate)
    pub prompt: String,
    /// Timeout for this invocation
    pub timeout: Duration,
    /// Per-invocation override of the backend's max output tokens
    pub max_tokens: Option<u32>,
    /// Per-invocation override of the backend's sampling temperature
    pub temperature: Option<f32>,
}

impl Invocation {
    #[must_use]
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            timeout,
            max_tokens: None,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text returned by a backend plus the bookkeeping providers report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendOutput {
    /// Raw response text
    pub text: String,
    /// Provider name (e.g. "ollama", "openai")
    pub provider: String,
    /// Model that actually answered
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

impl BackendOutput {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, input: Option<u64>, output: Option<u64>) -> Self {
        self.tokens_input = input;
        self.tokens_output = output;
        self
    }
}

/// Trait for generation backend implementations
///
/// Implementations must honor `inv.timeout` on a best-effort basis; the
/// executor additionally wraps every call in its own timeout.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Provider key this backend answers for.
    fn provider(&self) -> &str;

    /// Invoke the backend.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for transport failures, provider errors (auth,
    /// quota, outages), timeouts and budget exhaustion.
    async fn invoke(&self, inv: Invocation) -> Result<BackendOutput, LlmError>;
}
