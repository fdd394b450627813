use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use architect_utils::error::ConfigError;
use architect_utils::types::ArtifactType;

use super::{CliArgs, Config, ConfigSource, Defaults, ProvidersConfig, RoutingEntry, ValidationOverride};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ARCHITECT_CONFIG";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlConfig {
    defaults: Option<Defaults>,
    providers: Option<ProvidersConfig>,
    #[serde(default)]
    routing: BTreeMap<String, RoutingEntry>,
    #[serde(default)]
    validation: BTreeMap<String, ValidationOverride>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// The path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Config::default();
        for key in [
            "max_attempts",
            "attempt_timeout_secs",
            "commit_retries",
            "versions_dir",
            "verbose",
        ] {
            config
                .source_attribution
                .insert(key.to_string(), ConfigSource::Defaults);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => match env::var_os(CONFIG_ENV_VAR) {
                Some(path) => Some(PathBuf::from(path)),
                None => Self::discover_config_file_from(start_dir)?,
            },
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config, &ConfigSource::ConfigFile(path.clone()))?;
            debug!(path = %path.display(), "Loaded config file");
        }

        config.apply_cli(cli_args);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig, source: &ConfigSource) -> Result<(), ConfigError> {
        let attribution = &mut self.source_attribution;
        let mut mark = |key: &str| {
            attribution.insert(key.to_string(), source.clone());
        };

        if let Some(d) = file.defaults {
            if d.max_attempts.is_some() {
                self.defaults.max_attempts = d.max_attempts;
                mark("max_attempts");
            }
            if d.attempt_timeout_secs.is_some() {
                self.defaults.attempt_timeout_secs = d.attempt_timeout_secs;
                mark("attempt_timeout_secs");
            }
            if d.commit_retries.is_some() {
                self.defaults.commit_retries = d.commit_retries;
                mark("commit_retries");
            }
            if d.versions_dir.is_some() {
                self.defaults.versions_dir = d.versions_dir;
                mark("versions_dir");
            }
            if d.verbose.is_some() {
                self.defaults.verbose = d.verbose;
                mark("verbose");
            }
            if d.log_format.is_some() {
                self.defaults.log_format = d.log_format;
                mark("log_format");
            }
        }

        if let Some(providers) = file.providers {
            self.providers = providers;
            mark("providers");
        }

        for (tag, entry) in file.routing {
            let artifact = parse_artifact_key("routing", &tag)?;
            mark(&format!("routing.{artifact}"));
            self.routing.insert(artifact, entry);
        }

        for (tag, entry) in file.validation {
            let artifact = parse_artifact_key("validation", &tag)?;
            mark(&format!("validation.{artifact}"));
            self.validation.insert(artifact, entry);
        }

        Ok(())
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        if let Some(max_attempts) = cli.max_attempts {
            self.defaults.max_attempts = Some(max_attempts);
            self.source_attribution
                .insert("max_attempts".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout) = cli.attempt_timeout_secs {
            self.defaults.attempt_timeout_secs = Some(timeout);
            self.source_attribution
                .insert("attempt_timeout_secs".to_string(), ConfigSource::Cli);
        }
        if let Some(dir) = &cli.versions_dir {
            self.defaults.versions_dir = Some(dir.clone());
            self.source_attribution
                .insert("versions_dir".to_string(), ConfigSource::Cli);
        }
        // A bare `--verbose=false` is indistinguishable from "not passed".
        if cli.verbose == Some(true) {
            self.defaults.verbose = Some(true);
            self.source_attribution
                .insert("verbose".to_string(), ConfigSource::Cli);
        }
    }

    /// Search upward for `.architect/config.toml`, stopping at a repository root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current = Some(start_dir);
        while let Some(dir) = current {
            let candidate = dir.join(".architect").join("config.toml");
            if candidate.exists() {
                return Ok(Some(candidate));
            }
            if dir.join(".git").exists() || dir.join(".hg").exists() {
                break;
            }
            current = dir.parent();
        }
        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config file: {}", path.display())),
            // An explicitly named but missing file falls back to defaults.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        }
    }
}

fn parse_artifact_key(section: &str, tag: &str) -> Result<ArtifactType, ConfigError> {
    tag.parse::<ArtifactType>()
        .map_err(|e| ConfigError::InvalidValue {
            key: format!("{section}.{tag}"),
            value: e.to_string(),
        })
}

/// Source attribution rendered for `architect config`-style display.
#[must_use]
pub fn describe_sources(config: &Config) -> Vec<(String, String)> {
    let sources: &HashMap<String, ConfigSource> = &config.source_attribution;
    let mut rows: Vec<(String, String)> = sources
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect();
    rows.sort();
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tier;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let cfg_dir = dir.join(".architect");
        fs::create_dir_all(&cfg_dir).unwrap();
        let path = cfg_dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    fn isolated_cli(path: Option<PathBuf>) -> CliArgs {
        CliArgs {
            config_path: path,
            ..CliArgs::default()
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let missing = temp.path().join("absent.toml");

        let config = Config::discover_from(temp.path(), &isolated_cli(Some(missing))).unwrap();

        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.attempt_timeout().as_secs(), 60);
        assert_eq!(
            config.source_attribution.get("max_attempts"),
            Some(&ConfigSource::Defaults)
        );
    }

    #[test]
    fn test_file_values_and_cli_precedence() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
[defaults]
max_attempts = 5
attempt_timeout_secs = 30

[validation.erd]
threshold = 80
penalties = { relationships = 12 }

[[routing.erd.candidates]]
id = "cloud:only"
provider = "openai"
model = "gpt-4o"
tier = "cloud"
"#,
        );

        let cli = CliArgs {
            config_path: Some(path.clone()),
            max_attempts: Some(2),
            ..CliArgs::default()
        };
        let config = Config::discover_from(temp.path(), &cli).unwrap();

        assert_eq!(config.max_attempts(), 2);
        assert_eq!(config.attempt_timeout().as_secs(), 30);
        assert_eq!(config.threshold_for(ArtifactType::Erd), Some(80));
        assert_eq!(
            config.penalty_overrides(ArtifactType::Erd).get("relationships"),
            Some(&12)
        );
        let erd = config.candidates_for(ArtifactType::Erd);
        assert_eq!(erd.len(), 1);
        assert_eq!(erd[0].tier, Tier::Cloud);
        // Types without a routing entry keep the built-in list.
        assert!(config.candidates_for(ArtifactType::Sequence).len() > 1);

        assert_eq!(
            config.source_attribution.get("max_attempts"),
            Some(&ConfigSource::Cli)
        );
        assert_eq!(
            config.source_attribution.get("attempt_timeout_secs"),
            Some(&ConfigSource::ConfigFile(path))
        );
    }

    #[test]
    fn test_upward_discovery() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[defaults]\nmax_attempts = 4\n");
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = Config::discover_config_file_from(&nested).unwrap();
        assert_eq!(found, Some(temp.path().join(".architect").join("config.toml")));
    }

    #[test]
    fn test_discovery_stops_at_repository_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "[defaults]\nmax_attempts = 4\n");
        let repo = temp.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert_eq!(Config::discover_config_file_from(&repo).unwrap(), None);
    }

    #[test]
    fn test_unknown_artifact_key_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "[validation.frobnicate]\nthreshold = 50\n");

        let err = Config::discover_from(temp.path(), &isolated_cli(Some(path))).unwrap_err();
        assert!(format!("{err:#}").contains("frobnicate"));
    }

    #[test]
    fn test_describe_sources_is_sorted() {
        let config = Config::discover_from(
            Path::new("/"),
            &isolated_cli(Some(PathBuf::from("/nonexistent/architect.toml"))),
        )
        .unwrap();
        let rows = describe_sources(&config);
        let keys: Vec<&str> = rows.iter().map(|(k, _)| k.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
