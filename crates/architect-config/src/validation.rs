use std::collections::HashSet;

use architect_utils::error::ConfigError;

use super::{Config, KNOWN_PROVIDERS};

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max_attempts) = self.defaults.max_attempts {
            if max_attempts == 0 {
                return Err(invalid("max_attempts", "must be greater than 0"));
            }
            if max_attempts > 20 {
                return Err(invalid("max_attempts", "exceeds maximum limit of 20"));
            }
        }

        if let Some(timeout) = self.defaults.attempt_timeout_secs {
            if timeout == 0 {
                return Err(invalid("attempt_timeout_secs", "must be greater than 0"));
            }
            if timeout > 3600 {
                return Err(invalid(
                    "attempt_timeout_secs",
                    "exceeds maximum limit of 3600 seconds (1 hour)",
                ));
            }
        }

        if let Some(format) = self.defaults.log_format.as_deref()
            && !matches!(format, "compact" | "json")
        {
            return Err(invalid(
                "log_format",
                format!("'{format}' is not one of: compact, json"),
            ));
        }

        for (artifact, entry) in &self.routing {
            let key = format!("routing.{artifact}");
            if entry.candidates.is_empty() {
                return Err(invalid(key, "candidate list must not be empty"));
            }
            let mut seen = HashSet::new();
            for candidate in &entry.candidates {
                if candidate.id.trim().is_empty() || candidate.model.trim().is_empty() {
                    return Err(invalid(&key, "candidate id and model must be non-empty"));
                }
                if !KNOWN_PROVIDERS.contains(&candidate.provider.as_str()) {
                    return Err(invalid(
                        &key,
                        format!(
                            "unknown provider '{}' (supported: {})",
                            candidate.provider,
                            KNOWN_PROVIDERS.join(", ")
                        ),
                    ));
                }
                if !seen.insert(candidate.id.as_str()) {
                    return Err(invalid(&key, format!("duplicate candidate id '{}'", candidate.id)));
                }
                if candidate.timeout_secs == Some(0) {
                    return Err(invalid(&key, "candidate timeout_secs must be greater than 0"));
                }
            }
        }

        for (artifact, entry) in &self.validation {
            if let Some(threshold) = entry.threshold
                && threshold > 100
            {
                return Err(invalid(
                    format!("validation.{artifact}.threshold"),
                    "must be within 0-100",
                ));
            }
            for (rule, penalty) in &entry.penalties {
                if *penalty > 100 {
                    return Err(invalid(
                        format!("validation.{artifact}.penalties.{rule}"),
                        "must be within 0-100",
                    ));
                }
            }
        }

        Ok(())
    }
}
