use std::time::Duration;
use thiserror::Error;

use crate::types::ErrorKind;

/// Top-level error for library entry points and the CLI.
///
/// Crate-specific errors (`VersioningError`, `GenerationError`) are carried as
/// their rendered message plus an [`ErrorKind`] so this crate stays at the
/// bottom of the dependency graph.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 3 | Unknown artifact type |
/// | 4 | Generation exhausted |
/// | 5 | Versioning conflict |
/// | 130 | Cancelled |
/// | 1 | Other errors |
#[derive(Error, Debug)]
pub enum ArchitectError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Generation { kind: ErrorKind, message: String },
}

impl ArchitectError {
    /// Error kind used for structured reports.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Llm(LlmError::Timeout { .. }) => ErrorKind::Timeout,
            Self::Llm(LlmError::Misconfiguration(_) | LlmError::Unsupported(_)) => {
                ErrorKind::Configuration
            }
            Self::Llm(_) => ErrorKind::BackendUnreachable,
            Self::Io(_) => ErrorKind::Internal,
            Self::Generation { kind, .. } => *kind,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Config file not found at {path}")]
    NotFound { path: String },
}

/// Errors raised by generation backends.
///
/// These never escape the executor: every variant is folded into an attempt
/// diagnostic. They surface directly only when constructing backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Transport-level failure (connection refused, DNS, malformed response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Budget limit exceeded
    #[error("Budget exceeded: attempted {attempted} calls, limit is {limit}")]
    BudgetExceeded { limit: u32, attempted: u32 },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl LlmError {
    /// Whether this failure is a timeout rather than an unreachable backend.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
