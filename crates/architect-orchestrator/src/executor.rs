//! Runs one candidate and turns whatever happens into an [`Attempt`].

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, warn};

use crate::types::{Attempt, Candidate, GenerationRequest};
use architect_llm::{BackendRegistry, Invocation, LlmError};
use architect_utils::logging::attempt_span;
use architect_utils::redaction::redact_error_message;
use architect_utils::types::ErrorKind;
use architect_validation::OutputValidator;

/// Invokes backends and scores their output. Never fails: backend errors,
/// empty output and timeouts become failed attempts with a score of 0.
#[derive(Clone)]
pub struct Executor {
    backends: BackendRegistry,
    validator: Arc<OutputValidator>,
    default_timeout: Duration,
}

impl Executor {
    pub fn new(backends: BackendRegistry, validator: Arc<OutputValidator>, default_timeout: Duration) -> Self {
        Self {
            backends,
            validator,
            default_timeout,
        }
    }

    pub fn validator(&self) -> &OutputValidator {
        &self.validator
    }

    pub async fn execute(
        &self,
        index: usize,
        candidate: &Candidate,
        request: &GenerationRequest,
        threshold: u8,
    ) -> Attempt {
        self.execute_inner(index, candidate, request, threshold)
            .instrument(attempt_span(&candidate.id, index))
            .await
    }

    async fn execute_inner(
        &self,
        index: usize,
        candidate: &Candidate,
        request: &GenerationRequest,
        threshold: u8,
    ) -> Attempt {
        let started_at = Utc::now();
        let start = Instant::now();
        let timeout = candidate.timeout().unwrap_or(self.default_timeout);

        let outcome = match self.backends.get(&candidate.provider) {
            None => Err((
                ErrorKind::BackendUnreachable,
                format!("no backend registered for provider '{}'", candidate.provider),
            )),
            Some(backend) => {
                let inv = Invocation::new(&candidate.model, request.prompt(), timeout);
                match tokio::time::timeout(timeout, backend.invoke(inv)).await {
                    Err(_) => Err((
                        ErrorKind::Timeout,
                        format!("no response within {}s", timeout.as_secs()),
                    )),
                    Ok(Err(e)) => Err(classify(&e)),
                    Ok(Ok(output)) if output.text.trim().is_empty() => Err((
                        ErrorKind::EmptyOutput,
                        "backend returned no content".to_string(),
                    )),
                    Ok(Ok(output)) => Ok(output.text),
                }
            }
        };
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let base = Attempt {
            index,
            candidate: candidate.id.clone(),
            provider: candidate.provider.clone(),
            model: candidate.model.clone(),
            output: String::new(),
            score: 0,
            passed: false,
            diagnostics: Vec::new(),
            failure: None,
            started_at,
            latency_ms,
        };

        match outcome {
            Ok(text) => {
                let report = self.validator.validate(request.artifact(), &text);
                let passed = report.passes(threshold);
                debug!(
                    candidate = %candidate.id,
                    score = report.score,
                    threshold = threshold,
                    passed = passed,
                    latency_ms = latency_ms,
                    "Attempt scored"
                );
                Attempt {
                    output: text,
                    score: report.score,
                    passed,
                    diagnostics: report.messages(),
                    ..base
                }
            }
            Err((kind, message)) => {
                warn!(
                    candidate = %candidate.id,
                    failure = %kind,
                    latency_ms = latency_ms,
                    reason = %message,
                    "Attempt failed"
                );
                Attempt {
                    diagnostics: vec![format!("{kind}: {message}")],
                    failure: Some(kind),
                    ..base
                }
            }
        }
    }
}

fn classify(error: &LlmError) -> (ErrorKind, String) {
    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::BackendUnreachable
    };
    (kind, redact_error_message(&error.to_string()))
}
