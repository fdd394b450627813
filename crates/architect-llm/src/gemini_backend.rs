//! Google Gemini `generateContent` backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::LlmError;
use crate::http_client::{HttpClient, parse_json};
use crate::openai_compat_backend::HttpParams;
use crate::types::{BackendOutput, GenerationBackend, Invocation};
use architect_config::ProviderConfig;

pub(crate) const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub(crate) struct GeminiBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
    default_params: HttpParams,
}

impl GeminiBackend {
    pub fn new_from_config(config: Option<&ProviderConfig>) -> Result<Self, LlmError> {
        let key_env = config
            .and_then(|c| c.api_key_env.as_deref())
            .unwrap_or("GEMINI_API_KEY");
        let api_key = std::env::var(key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "gemini API key not found in environment variable '{key_env}'. \
                 Set it or configure api_key_env in [providers.gemini]."
            ))
        })?;

        Ok(Self {
            client: HttpClient::new()?,
            base_url: config
                .and_then(|c| c.base_url.clone())
                .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            default_params: HttpParams::from_provider(config),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn provider(&self) -> &str {
        "gemini"
    }

    async fn invoke(&self, inv: Invocation) -> Result<BackendOutput, LlmError> {
        let params = self.default_params.resolve(&inv);

        debug!(
            provider = "gemini",
            model = %inv.model,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Gemini backend"
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &inv.prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: params.max_tokens,
                temperature: params.temperature,
            },
        };

        // Key goes in a header so it never shows up in URL-bearing error messages.
        let request = self
            .client
            .post(&self.endpoint(&inv.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "gemini")
            .await?;
        let parsed: GenerateContentResponse = parse_json(response, "gemini").await?;

        let text = extract_text(&parsed).ok_or_else(|| {
            LlmError::Transport("gemini response missing candidates[0].content".to_string())
        })?;
        let usage = parsed.usage_metadata;

        Ok(BackendOutput::new(text, "gemini", inv.model).with_tokens(
            usage.as_ref().and_then(|u| u.prompt_token_count),
            usage.as_ref().and_then(|u| u.candidates_token_count),
        ))
    }
}

fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.first()?;
    let content = candidate.content.as_ref()?;
    Some(
        content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join(""),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}
