//! Ollama backend for locally served models

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LlmError;
use crate::http_client::{HttpClient, parse_json};
use crate::openai_compat_backend::HttpParams;
use crate::types::{BackendOutput, GenerationBackend, Invocation};
use architect_config::ProviderConfig;

pub(crate) const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Clone)]
pub(crate) struct OllamaBackend {
    client: HttpClient,
    base_url: String,
    default_params: HttpParams,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, default_params: HttpParams) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_params,
        })
    }

    pub fn new_from_config(config: Option<&ProviderConfig>) -> Result<Self, LlmError> {
        let base_url = config
            .and_then(|c| c.base_url.clone())
            .or_else(|| std::env::var("OLLAMA_HOST").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        Self::new(base_url, HttpParams::from_provider(config))
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn provider(&self) -> &str {
        "ollama"
    }

    async fn invoke(&self, inv: Invocation) -> Result<BackendOutput, LlmError> {
        let params = self.default_params.resolve(&inv);

        debug!(
            provider = "ollama",
            model = %inv.model,
            url = %self.base_url,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Ollama backend"
        );

        let body = GenerateRequest {
            model: &inv.model,
            prompt: &inv.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        let request = self.client.post(&self.generate_url()).json(&body);
        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "ollama")
            .await?;
        let parsed: GenerateResponse = parse_json(response, "ollama").await?;

        Ok(
            BackendOutput::new(parsed.response, "ollama", parsed.model.unwrap_or(inv.model))
                .with_tokens(parsed.prompt_eval_count, parsed.eval_count),
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: Option<String>,
    #[serde(default)]
    response: String,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = OllamaBackend::new("http://gpu-box:11434/", HttpParams::default()).unwrap();
        assert_eq!(backend.generate_url(), "http://gpu-box:11434/api/generate");
    }

    #[test]
    fn test_config_base_url_wins() {
        let config = ProviderConfig {
            base_url: Some("http://10.0.0.5:11434".into()),
            ..ProviderConfig::default()
        };
        let backend = OllamaBackend::new_from_config(Some(&config)).unwrap();
        assert_eq!(backend.base_url, "http://10.0.0.5:11434");
    }

    #[test]
    fn test_response_without_text_defaults_to_empty() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"model":"llama3.1:8b","done":true}"#).unwrap();
        assert_eq!(parsed.response, "");
        assert_eq!(parsed.eval_count, None);
    }
}
