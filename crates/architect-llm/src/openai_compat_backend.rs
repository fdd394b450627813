//! OpenAI-compatible chat completions backend
//!
//! Serves both OpenAI and Groq: the two speak the same wire format and differ
//! only in endpoint and key variable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LlmError;
use crate::http_client::{HttpClient, parse_json};
use crate::types::{BackendOutput, GenerationBackend, Invocation};
use architect_config::ProviderConfig;

pub(crate) const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub(crate) const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Request parameters applied when the invocation does not override them
#[derive(Debug, Clone, Copy)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.2,
        }
    }
}

impl HttpParams {
    pub(crate) fn from_provider(config: Option<&ProviderConfig>) -> Self {
        let defaults = Self::default();
        Self {
            max_tokens: config
                .and_then(|c| c.max_tokens)
                .unwrap_or(defaults.max_tokens),
            temperature: config
                .and_then(|c| c.temperature)
                .unwrap_or(defaults.temperature),
        }
    }

    pub(crate) fn resolve(self, inv: &Invocation) -> Self {
        Self {
            max_tokens: inv.max_tokens.unwrap_or(self.max_tokens),
            temperature: inv.temperature.unwrap_or(self.temperature),
        }
    }
}

#[derive(Clone)]
pub(crate) struct OpenAiCompatBackend {
    provider: String,
    client: HttpClient,
    url: String,
    api_key: String,
    default_params: HttpParams,
}

impl OpenAiCompatBackend {
    pub fn new(
        provider: impl Into<String>,
        api_key: String,
        url: String,
        default_params: HttpParams,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            provider: provider.into(),
            client: HttpClient::new()?,
            url,
            api_key,
            default_params,
        })
    }

    /// Construct from `[providers.<name>]`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` when the key variable is unset.
    pub fn new_from_config(
        provider: &str,
        default_url: &str,
        default_key_env: &str,
        config: Option<&ProviderConfig>,
    ) -> Result<Self, LlmError> {
        let key_env = config
            .and_then(|c| c.api_key_env.as_deref())
            .unwrap_or(default_key_env);
        let api_key = std::env::var(key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "{provider} API key not found in environment variable '{key_env}'. \
                 Set it or configure api_key_env in [providers.{provider}]."
            ))
        })?;
        let url = config
            .and_then(|c| c.base_url.clone())
            .unwrap_or_else(|| default_url.to_string());

        Self::new(provider, api_key, url, HttpParams::from_provider(config))
    }
}

#[async_trait]
impl GenerationBackend for OpenAiCompatBackend {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn invoke(&self, inv: Invocation) -> Result<BackendOutput, LlmError> {
        let params = self.default_params.resolve(&inv);

        debug!(
            provider = %self.provider,
            model = %inv.model,
            max_tokens = params.max_tokens,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking chat completions backend"
        );

        let body = ChatRequest {
            model: &inv.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &inv.prompt,
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let request = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, &self.provider)
            .await?;
        let parsed: ChatResponse = parse_json(response, &self.provider).await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                LlmError::Transport(format!(
                    "{} response missing choices[0].message.content",
                    self.provider
                ))
            })?;

        let usage = parsed.usage;
        Ok(
            BackendOutput::new(content, self.provider.clone(), parsed.model.unwrap_or(inv.model))
                .with_tokens(
                    usage.as_ref().map(|u| u.prompt_tokens),
                    usage.as_ref().map(|u| u.completion_tokens),
                ),
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
