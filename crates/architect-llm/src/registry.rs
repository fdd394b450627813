//! Provider-keyed backend registry built from configuration.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::LlmError;
use crate::budgeted_backend::BudgetedBackend;
use crate::gemini_backend::GeminiBackend;
use crate::ollama_backend::OllamaBackend;
use crate::openai_compat_backend::{GROQ_URL, OPENAI_URL, OpenAiCompatBackend};
use crate::types::{BackendOutput, GenerationBackend, Invocation};
use architect_config::{Config, KNOWN_PROVIDERS};
use architect_utils::redaction::redact_error_message;

/// Stand-in for a provider that could not be constructed (usually a missing
/// API key). Every call fails with the construction error so the executor
/// records it as an unreachable backend and moves on.
pub struct UnavailableBackend {
    provider: String,
    reason: LlmError,
}

impl UnavailableBackend {
    pub fn new(provider: impl Into<String>, reason: LlmError) -> Self {
        Self {
            provider: provider.into(),
            reason,
        }
    }
}

#[async_trait]
impl GenerationBackend for UnavailableBackend {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn invoke(&self, _inv: Invocation) -> Result<BackendOutput, LlmError> {
        Err(self.reason.clone())
    }
}

/// Maps provider keys to shared backend instances.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn GenerationBackend>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the backend for its provider key.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.insert(backend);
        self
    }

    pub fn insert(&mut self, backend: Arc<dyn GenerationBackend>) {
        self.backends.insert(backend.provider().to_string(), backend);
    }

    #[must_use]
    pub fn get(&self, provider: &str) -> Option<Arc<dyn GenerationBackend>> {
        self.backends.get(provider).cloned()
    }

    /// Registered provider keys, sorted.
    #[must_use]
    pub fn providers(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    /// Build one backend per known provider.
    ///
    /// Construction failures do not abort: the provider is registered as an
    /// [`UnavailableBackend`] so routing still sees it and falls through.
    /// Hosted providers are wrapped in a [`BudgetedBackend`].
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for provider in KNOWN_PROVIDERS {
            let backend: Arc<dyn GenerationBackend> = match construct_backend(provider, config) {
                Ok(backend) => {
                    debug!(provider = provider, "Registered backend");
                    Arc::from(backend)
                }
                Err(e) => {
                    warn!(
                        provider = provider,
                        reason = %redact_error_message(&e.to_string()),
                        "Backend unavailable; candidates using it will be skipped"
                    );
                    Arc::new(UnavailableBackend::new(provider, e))
                }
            };
            registry.backends.insert(provider.to_string(), backend);
        }
        registry
    }
}

fn construct_backend(provider: &str, config: &Config) -> Result<Box<dyn GenerationBackend>, LlmError> {
    let provider_config = config.providers.get(provider);
    let budget = provider_config.and_then(|p| p.budget);

    match provider {
        "ollama" => Ok(Box::new(OllamaBackend::new_from_config(provider_config)?)),
        "openai" => {
            let backend = OpenAiCompatBackend::new_from_config(
                "openai",
                OPENAI_URL,
                "OPENAI_API_KEY",
                provider_config,
            )?;
            Ok(Box::new(BudgetedBackend::with_limit_from_config(Box::new(backend), budget)))
        }
        "groq" => {
            let backend = OpenAiCompatBackend::new_from_config(
                "groq",
                GROQ_URL,
                "GROQ_API_KEY",
                provider_config,
            )?;
            Ok(Box::new(BudgetedBackend::with_limit_from_config(Box::new(backend), budget)))
        }
        "gemini" => {
            let backend = GeminiBackend::new_from_config(provider_config)?;
            Ok(Box::new(BudgetedBackend::with_limit_from_config(Box::new(backend), budget)))
        }
        unknown => Err(LlmError::Unsupported(format!(
            "Unknown provider '{}'. Supported providers: {}.",
            unknown,
            KNOWN_PROVIDERS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, ScriptedReply};
    use architect_config::ProviderConfig;
    use std::time::Duration;

    #[test]
    fn test_from_config_registers_every_known_provider() {
        let mut config = Config::default();
        for name in ["openai", "groq", "gemini"] {
            let p = ProviderConfig {
                api_key_env: Some(format!("ARCHITECT_TEST_UNSET_{}", name.to_uppercase())),
                ..ProviderConfig::default()
            };
            match name {
                "openai" => config.providers.openai = Some(p),
                "groq" => config.providers.groq = Some(p),
                _ => config.providers.gemini = Some(p),
            }
        }

        let registry = BackendRegistry::from_config(&config);
        assert_eq!(registry.providers(), vec!["gemini", "groq", "ollama", "openai"]);
    }

    #[tokio::test]
    async fn test_unavailable_backend_reports_construction_error() {
        let mut config = Config::default();
        config.providers.openai = Some(ProviderConfig {
            api_key_env: Some("ARCHITECT_TEST_UNSET_OPENAI".into()),
            ..ProviderConfig::default()
        });
        let registry = BackendRegistry::from_config(&config);
        let openai = registry.get("openai").unwrap();

        let err = openai
            .invoke(Invocation::new("gpt-4o-mini", "p", Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Misconfiguration(msg) if msg.contains("ARCHITECT_TEST_UNSET_OPENAI")));
    }

    #[test]
    fn test_with_backend_replaces_by_provider_key() {
        let registry = BackendRegistry::new()
            .with_backend(Arc::new(ScriptedBackend::repeating("ollama", ScriptedReply::text("a"))))
            .with_backend(Arc::new(ScriptedBackend::repeating("ollama", ScriptedReply::text("b"))));
        assert_eq!(registry.providers(), vec!["ollama"]);
        assert!(registry.get("openai").is_none());
    }

    #[test]
    fn test_unknown_provider_is_unsupported() {
        let err = construct_backend("llamafile", &Config::default()).err().unwrap();
        assert!(matches!(err, LlmError::Unsupported(_)));
    }
}
