//! Retry/fallback state machine
//!
//! ```text
//! Pending -> Trying(0) -> Trying(1) -> ... -> Accepted | Degraded | Exhausted
//! ```
//!
//! Candidates run one at a time in priority order. The loop stops on the
//! first attempt that clears the threshold, when candidates run out, or when
//! the attempt ceiling is hit. Cancellation is observed between attempts; an
//! attempt already running is allowed to finish and its result is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::error::GenerationError;
use crate::events::{EventSink, GenerationEvent, NoopSink};
use crate::executor::Executor;
use crate::resolver::{Resolver, RoutingRegistry, RoutingTable};
use crate::types::{Attempt, Candidate, GenerationRequest, GenerationResult, GenerationStatus};
use architect_config::{Config, DEFAULT_COMMIT_RETRIES, DEFAULT_MAX_ATTEMPTS};
use architect_llm::BackendRegistry;
use architect_utils::logging::generation_span;
use architect_utils::types::ArtifactType;
use architect_validation::{OutputValidator, default_threshold};
use architect_versioning::{VersionMetadata, VersionStore, append_version};

/// Controller states. `Accepted` and `Degraded` carry the index of the kept
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Pending,
    Trying(usize),
    Accepted(usize),
    Degraded(usize),
    Exhausted,
}

/// Drives requests from resolution to a committed version.
///
/// Shareable across tasks; all per-request state lives on the stack of
/// [`Controller::run`].
#[derive(Clone)]
pub struct Controller {
    resolver: Resolver,
    executor: Executor,
    store: Arc<dyn VersionStore>,
    max_attempts: u32,
    commit_retries: u32,
    thresholds: BTreeMap<ArtifactType, u8>,
}

impl Controller {
    pub fn new(resolver: Resolver, executor: Executor, store: Arc<dyn VersionStore>) -> Self {
        Self {
            resolver,
            executor,
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            commit_retries: DEFAULT_COMMIT_RETRIES,
            thresholds: BTreeMap::new(),
        }
    }

    /// Wire a controller from resolved configuration.
    pub fn from_config(config: &Config, backends: BackendRegistry, store: Arc<dyn VersionStore>) -> Self {
        let resolver = Resolver::new(Arc::new(RoutingRegistry::new(RoutingTable::from_config(config))));
        let executor = Executor::new(
            backends,
            Arc::new(OutputValidator::from_config(config)),
            config.attempt_timeout(),
        );
        let mut controller = Self::new(resolver, executor, store)
            .with_max_attempts(config.max_attempts())
            .with_commit_retries(config.commit_retries());
        for artifact in ArtifactType::ALL {
            if let Some(threshold) = config.threshold_for(artifact) {
                controller = controller.with_threshold(artifact, threshold);
            }
        }
        controller
    }

    /// Attempt ceiling per request (at least 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_commit_retries(mut self, retries: u32) -> Self {
        self.commit_retries = retries;
        self
    }

    /// Deployment threshold for an artifact type.
    #[must_use]
    pub fn with_threshold(mut self, artifact: ArtifactType, threshold: u8) -> Self {
        self.thresholds.insert(artifact, threshold.min(100));
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// Request override, then deployment setting, then the validator default.
    pub fn threshold_for(&self, request: &GenerationRequest) -> u8 {
        request
            .threshold()
            .or_else(|| self.thresholds.get(&request.artifact()).copied())
            .unwrap_or_else(|| default_threshold(request.artifact()))
    }

    /// Run a request without events or cancellation.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult, GenerationError> {
        self.run(request, &NoopSink, &CancellationToken::new()).await
    }

    /// Run a request to a terminal state.
    ///
    /// Returns the committed result for `Accepted`/`Degraded`. `Exhausted`,
    /// cancellation and commit failures are returned as errors and nothing is
    /// persisted.
    pub async fn run(
        &self,
        request: GenerationRequest,
        events: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        let span = generation_span(request.request_id(), request.artifact().as_str());
        let result = self.drive(&request, events, cancel).instrument(span).await;
        if let Err(e) = &result {
            events.emit(GenerationEvent::Failed {
                request_id: request.request_id().to_string(),
                kind: e.kind(),
                reason: e.to_string(),
            });
        }
        result
    }

    async fn drive(
        &self,
        request: &GenerationRequest,
        events: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        let threshold = self.threshold_for(request);
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut state = ControllerState::Pending;

        loop {
            debug!(state = ?state, attempts = attempts.len(), "Controller state");
            state = match state {
                ControllerState::Pending => {
                    candidates = self.resolver.resolve(request.artifact())?;
                    events.emit(GenerationEvent::Started {
                        request_id: request.request_id().to_string(),
                        artifact: request.artifact(),
                        candidates: candidates.iter().map(|c| c.id.clone()).collect(),
                    });
                    ControllerState::Trying(0)
                }
                ControllerState::Trying(i) => {
                    if cancel.is_cancelled() {
                        return Err(cancelled(attempts));
                    }
                    let attempt = self
                        .executor
                        .execute(attempts.len(), &candidates[i], request, threshold)
                        .await;
                    if cancel.is_cancelled() {
                        debug!(candidate = %attempt.candidate, "Discarding attempt finished after cancellation");
                        return Err(cancelled(attempts));
                    }

                    events.emit(GenerationEvent::Attempt {
                        request_id: request.request_id().to_string(),
                        index: attempt.index,
                        candidate: attempt.candidate.clone(),
                        score: attempt.score,
                        passed: attempt.passed,
                        failure: attempt.failure,
                    });
                    let passed = attempt.passed;
                    attempts.push(attempt);

                    let under_ceiling = attempts.len() < self.max_attempts as usize;
                    if passed {
                        ControllerState::Accepted(attempts.len() - 1)
                    } else if i + 1 < candidates.len() && under_ceiling {
                        ControllerState::Trying(i + 1)
                    } else {
                        match best_attempt(&attempts) {
                            Some(best) => ControllerState::Degraded(best),
                            None => ControllerState::Exhausted,
                        }
                    }
                }
                ControllerState::Accepted(index) => {
                    return self
                        .finish(request, attempts, index, GenerationStatus::Accepted, threshold, events)
                        .await;
                }
                ControllerState::Degraded(index) => {
                    return self
                        .finish(request, attempts, index, GenerationStatus::AcceptedDegraded, threshold, events)
                        .await;
                }
                ControllerState::Exhausted => {
                    warn!(attempts = attempts.len(), "No candidate produced usable output");
                    return Err(GenerationError::GenerationExhausted {
                        artifact: request.artifact(),
                        attempts,
                    });
                }
            };
        }
    }

    async fn finish(
        &self,
        request: &GenerationRequest,
        attempts: Vec<Attempt>,
        index: usize,
        status: GenerationStatus,
        threshold: u8,
        events: &dyn EventSink,
    ) -> Result<GenerationResult, GenerationError> {
        let accepted = attempts.get(index).ok_or_else(|| GenerationError::Internal {
            message: format!("accepted attempt {index} missing from history"),
        })?;
        let candidate = accepted.candidate.clone();
        let score = accepted.score;
        let metadata = VersionMetadata {
            status: Some(status.as_str().to_string()),
            candidate: Some(candidate.clone()),
            score: Some(score),
            attempts: attempts.len(),
            request_id: Some(request.request_id().to_string()),
        };

        // Stores may block on a file lock; keep that off the async workers.
        let store = Arc::clone(&self.store);
        let artifact = request.artifact();
        let content = accepted.output.clone();
        let retries = self.commit_retries;
        let committed = tokio::task::spawn_blocking(move || {
            append_version(store.as_ref(), artifact, &content, metadata, retries)
        })
        .await
        .map_err(|e| GenerationError::Internal {
            message: format!("version commit task failed: {e}"),
        })?;
        let outcome = match committed {
            Ok(outcome) => outcome,
            Err(source) => {
                warn!(candidate = %candidate, error = %source, "Accepted output could not be committed");
                return Err(GenerationError::Versioning { source, attempts });
            }
        };

        info!(
            status = %status,
            candidate = %candidate,
            score = score,
            attempts = attempts.len(),
            version = outcome.version(),
            "Generation finished"
        );
        events.emit(GenerationEvent::Completed {
            request_id: request.request_id().to_string(),
            status,
            version: outcome.version(),
            candidate,
            score,
        });

        Ok(GenerationResult::new(
            request,
            attempts,
            index,
            status,
            threshold,
            outcome.version(),
            outcome.is_created(),
        ))
    }
}

fn cancelled(attempts: Vec<Attempt>) -> GenerationError {
    info!(attempts = attempts.len(), "Generation cancelled");
    GenerationError::Cancelled { attempts }
}

/// Highest-scoring usable attempt; the earliest wins a tie.
fn best_attempt(attempts: &[Attempt]) -> Option<usize> {
    let mut best: Option<&Attempt> = None;
    for attempt in attempts.iter().filter(|a| a.is_usable()) {
        if best.is_none_or(|b| attempt.score > b.score) {
            best = Some(attempt);
        }
    }
    best.map(|a| a.index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use architect_config::Tier;
    use architect_llm::testing::{ScriptedBackend, ScriptedReply};
    use architect_utils::types::ErrorKind;
    use architect_versioning::{CommitOutcome, InMemoryVersionStore, VersionRecord, VersioningError};
    use chrono::Utc;
    use std::time::Duration;

    fn attempt(index: usize, score: u8, failure: Option<ErrorKind>) -> Attempt {
        Attempt {
            index,
            candidate: format!("c{index}"),
            provider: "ollama".into(),
            model: "m".into(),
            output: if failure.is_some() { String::new() } else { "x".into() },
            score,
            passed: false,
            diagnostics: Vec::new(),
            failure,
            started_at: Utc::now(),
            latency_ms: 0,
        }
    }

    fn controller(table: RoutingTable) -> Controller {
        let backends = BackendRegistry::new().with_backend(Arc::new(ScriptedBackend::repeating(
            "ollama",
            ScriptedReply::text("erDiagram\nUSER { int id }"),
        )));
        let executor = Executor::new(backends, Arc::new(OutputValidator::new()), Duration::from_secs(5));
        Controller::new(
            Resolver::from_table(table),
            executor,
            Arc::new(InMemoryVersionStore::new()),
        )
    }

    #[test]
    fn test_best_attempt_prefers_earliest_on_tie() {
        let attempts = vec![attempt(0, 40, None), attempt(1, 55, None), attempt(2, 55, None)];
        assert_eq!(best_attempt(&attempts), Some(1));
    }

    #[test]
    fn test_best_attempt_skips_failures() {
        let attempts = vec![
            attempt(0, 0, Some(ErrorKind::Timeout)),
            attempt(1, 0, Some(ErrorKind::EmptyOutput)),
        ];
        assert_eq!(best_attempt(&attempts), None);

        let attempts = vec![attempt(0, 0, Some(ErrorKind::BackendUnreachable)), attempt(1, 0, None)];
        assert_eq!(best_attempt(&attempts), Some(1));
    }

    #[test]
    fn test_threshold_precedence() {
        let controller = controller(RoutingTable::builtin()).with_threshold(ArtifactType::Erd, 80);

        let plain = GenerationRequest::new(ArtifactType::Erd, "p");
        assert_eq!(controller.threshold_for(&plain), 80);

        let overridden = GenerationRequest::new(ArtifactType::Erd, "p").with_threshold(50);
        assert_eq!(controller.threshold_for(&overridden), 50);

        let other = GenerationRequest::new(ArtifactType::ApiDocs, "p");
        assert_eq!(controller.threshold_for(&other), 60);
    }

    #[test]
    fn test_max_attempts_floor_is_one() {
        let controller = controller(RoutingTable::builtin()).with_max_attempts(0);
        assert_eq!(controller.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let table = RoutingTable::default().with_entry(
            ArtifactType::Erd,
            vec![Candidate::new("local:llama3", Tier::Local, "ollama", "llama3.1:8b")],
        );
        let controller = controller(table);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = controller
            .run(GenerationRequest::new(ArtifactType::Erd, "p"), &NoopSink, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.attempts().is_empty());
        assert!(controller.store().list(ArtifactType::Erd).unwrap().is_empty());
    }

    /// Store whose latest version moves on every read, so no commit lands.
    struct AlwaysConflicting;

    impl VersionStore for AlwaysConflicting {
        fn latest_version(&self, _artifact: ArtifactType) -> Result<Option<u64>, VersioningError> {
            Ok(None)
        }

        fn commit(
            &self,
            artifact: ArtifactType,
            expected_latest: Option<u64>,
            _content: &str,
            _metadata: VersionMetadata,
        ) -> Result<CommitOutcome, VersioningError> {
            Err(VersioningError::Conflict {
                artifact,
                expected: expected_latest,
                actual: Some(expected_latest.unwrap_or(0) + 1),
            })
        }

        fn get_current(&self, _artifact: ArtifactType) -> Result<Option<VersionRecord>, VersioningError> {
            Ok(None)
        }

        fn list(&self, _artifact: ArtifactType) -> Result<Vec<VersionRecord>, VersioningError> {
            Ok(Vec::new())
        }

        fn restore(&self, artifact: ArtifactType, version: u64) -> Result<VersionRecord, VersioningError> {
            Err(VersioningError::NotFound { artifact, version })
        }
    }

    #[tokio::test]
    async fn test_commit_conflict_keeps_attempt_history() {
        let table = RoutingTable::default().with_entry(
            ArtifactType::Erd,
            vec![Candidate::new("local:llama3", Tier::Local, "ollama", "llama3.1:8b")],
        );
        let base = controller(table);
        let controller = Controller::new(
            base.resolver.clone(),
            base.executor.clone(),
            Arc::new(AlwaysConflicting),
        )
        .with_commit_retries(2);

        let err = controller
            .generate(GenerationRequest::new(ArtifactType::Erd, "p"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::VersioningConflict);
        assert_eq!(err.attempts().len(), 1);
        assert!(err.attempts()[0].passed);
        assert_eq!(err.attempts()[0].output, "erDiagram\nUSER { int id }");

        let report = err.to_report();
        assert_eq!(report.kind, ErrorKind::VersioningConflict);
        assert_eq!(report.attempts.len(), 1);
    }
}
