//! Budgeted backend wrapper for call limiting
//!
//! Wraps a hosted provider so a misbehaving prompt or a retry storm cannot run
//! up an unbounded bill.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

use crate::LlmError;
use crate::types::{BackendOutput, GenerationBackend, Invocation};

/// Default call limit per hosted provider per process
pub const DEFAULT_BUDGET_LIMIT: u32 = 50;

/// Environment variable overriding every provider's budget
pub const BUDGET_ENV_VAR: &str = "ARCHITECT_CLOUD_BUDGET";

/// A wrapper that enforces a limit on invocations.
///
/// The budget tracks attempted calls, not successful ones: a failed call
/// still consumes its slot.
pub struct BudgetedBackend {
    inner: Box<dyn GenerationBackend>,
    used: AtomicU32,
    limit: u32,
}

impl BudgetedBackend {
    pub fn new(inner: Box<dyn GenerationBackend>, limit: u32) -> Self {
        debug!(provider = inner.provider(), limit = limit, "Creating BudgetedBackend");
        Self {
            inner,
            used: AtomicU32::new(0),
            limit,
        }
    }

    /// Resolve the limit with precedence env var > config > default.
    pub fn with_limit_from_config(inner: Box<dyn GenerationBackend>, config_budget: Option<u32>) -> Self {
        let env_budget = std::env::var(BUDGET_ENV_VAR)
            .ok()
            .and_then(|s| s.parse::<u32>().ok());
        let limit = env_budget.or(config_budget).unwrap_or(DEFAULT_BUDGET_LIMIT);
        Self::new(inner, limit)
    }

    /// Calls attempted so far.
    pub fn calls_used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[async_trait]
impl GenerationBackend for BudgetedBackend {
    fn provider(&self) -> &str {
        self.inner.provider()
    }

    async fn invoke(&self, inv: Invocation) -> Result<BackendOutput, LlmError> {
        // Count before calling so concurrent requests cannot overshoot.
        let current = self.used.fetch_add(1, Ordering::SeqCst);

        if current >= self.limit {
            let attempted = current + 1;
            warn!(
                provider = self.inner.provider(),
                limit = self.limit,
                attempted = attempted,
                "Budget limit exceeded"
            );
            return Err(LlmError::BudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }

        debug!(
            provider = self.inner.provider(),
            call_count = current + 1,
            limit = self.limit,
            "Budget check passed"
        );

        self.inner.invoke(inv).await
    }
}
