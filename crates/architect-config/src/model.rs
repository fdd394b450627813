use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use architect_utils::types::{ArtifactType, ConfigSource};

/// Default ceiling on attempts per generation request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default per-attempt timeout in seconds
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 60;

/// Default bounded retries for a racing version commit
pub const DEFAULT_COMMIT_RETRIES: u32 = 3;

/// Default directory for the file-backed version store
pub const DEFAULT_VERSIONS_DIR: &str = ".architect/versions";

/// Providers the backend registry knows how to construct.
pub const KNOWN_PROVIDERS: [&str; 4] = ["ollama", "groq", "openai", "gemini"];

/// Configuration for architect operations.
///
/// Use [`Config::discover()`] for CLI-like behavior that searches for
/// `.architect/config.toml` upward from the current directory (or uses
/// `ARCHITECT_CONFIG`) and applies built-in defaults for anything unset.
///
/// ```toml
/// [defaults]
/// max_attempts = 3
/// attempt_timeout_secs = 45
///
/// [providers.openai]
/// api_key_env = "OPENAI_API_KEY"
/// budget = 50
///
/// [[routing.erd.candidates]]
/// id = "local:llama3"
/// provider = "ollama"
/// model = "llama3.1:8b"
/// tier = "local"
///
/// [validation.erd]
/// threshold = 75
/// penalties = { relationships = 10 }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Default values for orchestration settings.
    pub defaults: Defaults,
    /// Provider connection settings.
    pub providers: ProvidersConfig,
    /// Per-artifact candidate lists that replace the built-in table.
    pub routing: BTreeMap<ArtifactType, RoutingEntry>,
    /// Per-artifact threshold and penalty overrides.
    pub validation: BTreeMap<ArtifactType, ValidationOverride>,
    /// Source attribution for each setting (for status display).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Defaults {
    pub max_attempts: Option<u32>,
    pub attempt_timeout_secs: Option<u64>,
    pub commit_retries: Option<u32>,
    pub versions_dir: Option<String>,
    pub verbose: Option<bool>,
    /// "compact" or "json"
    pub log_format: Option<String>,
}

/// `[providers]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    pub ollama: Option<ProviderConfig>,
    pub groq: Option<ProviderConfig>,
    pub openai: Option<ProviderConfig>,
    pub gemini: Option<ProviderConfig>,
}

impl ProvidersConfig {
    /// Settings for a provider key, if configured.
    #[must_use]
    pub fn get(&self, provider: &str) -> Option<&ProviderConfig> {
        match provider {
            "ollama" => self.ollama.as_ref(),
            "groq" => self.groq.as_ref(),
            "openai" => self.openai.as_ref(),
            "gemini" => self.gemini.as_ref(),
            _ => None,
        }
    }
}

/// Connection settings for one provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Environment variable holding the API key (ignored for ollama)
    pub api_key_env: Option<String>,
    /// Override for the provider endpoint
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Maximum calls per process (cloud providers only)
    pub budget: Option<u32>,
}

/// Whether a candidate runs locally or against a hosted API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Local,
    Cloud,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Cloud => write!(f, "cloud"),
        }
    }
}

/// One candidate declaration under `[[routing.<artifact>.candidates]]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CandidateConfig {
    /// Display id, e.g. `local:llama3`
    pub id: String,
    /// Backend registry key
    pub provider: String,
    pub model: String,
    pub tier: Tier,
    pub timeout_secs: Option<u64>,
}

/// `[routing.<artifact>]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingEntry {
    #[serde(default)]
    pub candidates: Vec<CandidateConfig>,
}

/// `[validation.<artifact>]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ValidationOverride {
    /// Pass threshold (0-100)
    pub threshold: Option<u8>,
    /// Penalty overrides keyed by rule tag
    #[serde(default)]
    pub penalties: BTreeMap<String, u32>,
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub max_attempts: Option<u32>,
    pub attempt_timeout_secs: Option<u64>,
    pub versions_dir: Option<String>,
    pub verbose: Option<bool>,
}

impl Config {
    /// Ceiling on attempts per request.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.defaults.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    /// Default per-attempt timeout when a candidate declares none.
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .attempt_timeout_secs
                .unwrap_or(DEFAULT_ATTEMPT_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn commit_retries(&self) -> u32 {
        self.defaults.commit_retries.unwrap_or(DEFAULT_COMMIT_RETRIES)
    }

    #[must_use]
    pub fn versions_dir(&self) -> PathBuf {
        PathBuf::from(
            self.defaults
                .versions_dir
                .as_deref()
                .unwrap_or(DEFAULT_VERSIONS_DIR),
        )
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    /// Candidate declarations for an artifact type.
    ///
    /// A `[routing.<artifact>]` entry replaces the built-in list for that type
    /// wholesale; types without an entry use [`builtin_candidates`].
    ///
    /// [`builtin_candidates`]: crate::builtin_candidates
    #[must_use]
    pub fn candidates_for(&self, artifact: ArtifactType) -> Vec<CandidateConfig> {
        match self.routing.get(&artifact) {
            Some(entry) => entry.candidates.clone(),
            None => crate::routing::builtin_candidates(artifact),
        }
    }

    /// Threshold override for an artifact type, if configured.
    #[must_use]
    pub fn threshold_for(&self, artifact: ArtifactType) -> Option<u8> {
        self.validation.get(&artifact).and_then(|v| v.threshold)
    }

    /// Penalty overrides for an artifact type (empty if none).
    #[must_use]
    pub fn penalty_overrides(&self, artifact: ArtifactType) -> BTreeMap<String, u32> {
        self.validation
            .get(&artifact)
            .map(|v| v.penalties.clone())
            .unwrap_or_default()
    }
}
