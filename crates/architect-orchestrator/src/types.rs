use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::GenerationError;
use architect_config::{CandidateConfig, Tier};
use architect_utils::types::{ArtifactType, ErrorKind};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A generation backend reference ranked for an artifact type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Display id, e.g. `local:llama3`
    pub id: String,
    pub tier: Tier,
    /// Backend registry key
    pub provider: String,
    pub model: String,
    /// Overrides the executor's default timeout
    pub timeout_secs: Option<u64>,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        tier: Tier,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tier,
            provider: provider.into(),
            model: model.into(),
            timeout_secs: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl From<&CandidateConfig> for Candidate {
    fn from(c: &CandidateConfig) -> Self {
        Self {
            id: c.id.clone(),
            tier: c.tier,
            provider: c.provider.clone(),
            model: c.model.clone(),
            timeout_secs: c.timeout_secs,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.id, self.provider, self.model)
    }
}

/// One generation request. Fields are fixed at construction.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    request_id: String,
    artifact: ArtifactType,
    prompt: String,
    threshold: Option<u8>,
}

impl GenerationRequest {
    pub fn new(artifact: ArtifactType, prompt: impl Into<String>) -> Self {
        let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            request_id: format!("gen-{}-{seq}", Utc::now().format("%Y%m%dT%H%M%S%.3f")),
            artifact,
            prompt: prompt.into(),
            threshold: None,
        }
    }

    /// Parse the artifact tag; unknown tags fail before anything runs.
    pub fn parse(tag: &str, prompt: impl Into<String>) -> Result<Self, GenerationError> {
        let artifact: ArtifactType = tag.parse()?;
        Ok(Self::new(artifact, prompt))
    }

    /// Per-request pass threshold, clamped to 100.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = Some(threshold.min(100));
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn artifact(&self) -> ArtifactType {
        self.artifact
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn threshold(&self) -> Option<u8> {
        self.threshold
    }
}

/// Record of one candidate execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Position in execution order, from 0
    pub index: usize,
    pub candidate: String,
    pub provider: String,
    pub model: String,
    pub output: String,
    pub score: u8,
    pub passed: bool,
    pub diagnostics: Vec<String>,
    /// `BackendUnreachable`, `EmptyOutput` or `Timeout` for failed calls
    pub failure: Option<ErrorKind>,
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl Attempt {
    /// True when the backend produced non-empty output, whatever it scored.
    pub fn is_usable(&self) -> bool {
        self.failure.is_none() && !self.output.trim().is_empty()
    }
}

/// Terminal status of a successful request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationStatus {
    #[serde(rename = "accepted")]
    Accepted,
    /// No attempt cleared the threshold; the best one was kept.
    #[serde(rename = "accepted-degraded")]
    AcceptedDegraded,
}

impl GenerationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::AcceptedDegraded => "accepted-degraded",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finalized outcome of a request, as committed to the version store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    request_id: String,
    artifact: ArtifactType,
    content: String,
    accepted_index: usize,
    attempts: Vec<Attempt>,
    status: GenerationStatus,
    threshold: u8,
    version: u64,
    version_created: bool,
}

impl GenerationResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        request: &GenerationRequest,
        attempts: Vec<Attempt>,
        accepted_index: usize,
        status: GenerationStatus,
        threshold: u8,
        version: u64,
        version_created: bool,
    ) -> Self {
        let content = attempts
            .get(accepted_index)
            .map(|a| a.output.clone())
            .unwrap_or_default();
        Self {
            request_id: request.request_id().to_string(),
            artifact: request.artifact(),
            content,
            accepted_index,
            attempts,
            status,
            threshold,
            version,
            version_created,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn artifact(&self) -> ArtifactType {
        self.artifact
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Attempts in execution order.
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn accepted_attempt(&self) -> Option<&Attempt> {
        self.attempts.get(self.accepted_index)
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Version assigned (or matched, when the content was unchanged).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// False when the content matched the current version and nothing new was stored.
    pub fn version_created(&self) -> bool {
        self.version_created
    }
}
