//! Deterministic backends for tests.
//!
//! Not part of the public API stability guarantees.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::LlmError;
use crate::types::{BackendOutput, GenerationBackend, Invocation};

/// One canned reply.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    delay: Option<Duration>,
    outcome: Result<String, LlmError>,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            delay: None,
            outcome: Ok(text.into()),
        }
    }

    pub fn error(error: LlmError) -> Self {
        Self {
            delay: None,
            outcome: Err(error),
        }
    }

    /// Sleep before replying (used to exercise timeouts and cancellation).
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Backend that replays a script of replies in order.
///
/// Once the script runs dry the last reply repeats. Every invocation is
/// recorded so tests can assert which models were called and in what order.
pub struct ScriptedBackend {
    provider: String,
    script: Mutex<VecDeque<ScriptedReply>>,
    last: Mutex<Option<ScriptedReply>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedBackend {
    pub fn new(provider: impl Into<String>, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            provider: provider.into(),
            script: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(provider: impl Into<String>, reply: ScriptedReply) -> Self {
        Self::new(provider, [reply])
    }

    /// Models requested so far, in call order.
    pub fn called_models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|inv| inv.model.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        match script.pop_front() {
            Some(reply) => {
                *last = Some(reply.clone());
                Some(reply)
            }
            None => last.clone(),
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn invoke(&self, inv: Invocation) -> Result<BackendOutput, LlmError> {
        self.calls.lock().unwrap().push(inv.clone());
        let reply = self
            .next_reply()
            .ok_or_else(|| LlmError::Transport("script is empty".to_string()))?;

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }

        reply
            .outcome
            .map(|text| BackendOutput::new(text, self.provider.clone(), inv.model))
    }
}

/// Backend that answers per model name, for registries where several
/// candidates share one provider key.
pub struct ModelRouterBackend {
    provider: String,
    routes: Vec<(String, ScriptedBackend)>,
}

impl ModelRouterBackend {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            routes: Vec::new(),
        }
    }

    #[must_use]
    pub fn route(mut self, model: impl Into<String>, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        let provider = self.provider.clone();
        self.routes
            .push((model.into(), ScriptedBackend::new(provider, replies)));
        self
    }

    /// Number of calls a model received.
    pub fn calls_for(&self, model: &str) -> usize {
        self.routes
            .iter()
            .find(|(m, _)| m == model)
            .map_or(0, |(_, b)| b.call_count())
    }
}

#[async_trait]
impl GenerationBackend for ModelRouterBackend {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn invoke(&self, inv: Invocation) -> Result<BackendOutput, LlmError> {
        match self.routes.iter().find(|(m, _)| *m == inv.model) {
            Some((_, backend)) => backend.invoke(inv).await,
            None => Err(LlmError::Transport(format!(
                "model '{}' not found",
                inv.model
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(model: &str) -> Invocation {
        Invocation::new(model, "prompt", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_script_replays_then_repeats_last() {
        let backend = ScriptedBackend::new(
            "ollama",
            [ScriptedReply::text("first"), ScriptedReply::text("second")],
        );
        assert_eq!(backend.invoke(inv("a")).await.unwrap().text, "first");
        assert_eq!(backend.invoke(inv("b")).await.unwrap().text, "second");
        assert_eq!(backend.invoke(inv("c")).await.unwrap().text, "second");
        assert_eq!(backend.called_models(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_router_dispatches_by_model() {
        let backend = ModelRouterBackend::new("ollama")
            .route("llama", [ScriptedReply::text("from llama")])
            .route("mistral", [ScriptedReply::text("from mistral")]);

        assert_eq!(
            backend.invoke(inv("mistral")).await.unwrap().text,
            "from mistral"
        );
        assert!(backend.invoke(inv("phi")).await.is_err());
        assert_eq!(backend.calls_for("mistral"), 1);
        assert_eq!(backend.calls_for("llama"), 0);
    }
}
