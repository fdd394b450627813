use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::report::{Diagnostic, ValidationReport};
use crate::rules::{Severity, rule_set};
use architect_config::Config;
use architect_utils::types::ArtifactType;

/// Tag reported when content is empty or whitespace.
pub const EMPTY_OUTPUT_RULE: &str = "empty_output";

/// Tag reported when content exceeds the rule set's length ceiling.
pub const OVERSIZE_RULE: &str = "oversize";

/// Pass threshold used when neither the request nor config sets one.
pub const fn default_threshold(artifact: ArtifactType) -> u8 {
    match artifact {
        ArtifactType::CodePrototype => 65,
        a if a.is_diagram() => 70,
        _ => 60,
    }
}

/// Scores content against the built-in rule sets.
///
/// Per-rule penalties can be overridden per artifact type; everything else is
/// fixed, so two calls with the same input always agree.
#[derive(Debug, Clone, Default)]
pub struct OutputValidator {
    penalty_overrides: BTreeMap<ArtifactType, BTreeMap<String, u32>>,
}

impl OutputValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with the `[validation.<type>.penalties]` overrides applied.
    ///
    /// Override tags that name no rule are logged and ignored.
    pub fn from_config(config: &Config) -> Self {
        let mut validator = Self::new();
        for artifact in ArtifactType::ALL {
            for (tag, penalty) in config.penalty_overrides(artifact) {
                validator = validator.with_penalty(artifact, &tag, penalty);
            }
        }
        validator
    }

    #[must_use]
    pub fn with_penalty(mut self, artifact: ArtifactType, tag: &str, penalty: u32) -> Self {
        if rule_set(artifact).get(tag).is_none() {
            warn!(
                artifact = %artifact,
                rule = tag,
                "Ignoring penalty override for unknown rule"
            );
            return self;
        }
        self.penalty_overrides
            .entry(artifact)
            .or_default()
            .insert(tag.to_string(), penalty);
        self
    }

    fn penalty_for(&self, artifact: ArtifactType, tag: &str, default: u32) -> u32 {
        self.penalty_overrides
            .get(&artifact)
            .and_then(|m| m.get(tag))
            .copied()
            .unwrap_or(default)
    }

    /// Score `content` as an `artifact`.
    pub fn validate(&self, artifact: ArtifactType, content: &str) -> ValidationReport {
        if content.trim().is_empty() {
            return ValidationReport {
                score: 0,
                diagnostics: vec![Diagnostic {
                    rule: EMPTY_OUTPUT_RULE.to_string(),
                    severity: Severity::Required,
                    message: "empty output".to_string(),
                    penalty: 100,
                }],
            };
        }

        let set = rule_set(artifact);
        let mut diagnostics = Vec::new();
        let mut deducted: u32 = 0;

        for rule in &set.rules {
            if let Some(message) = rule.check.failure(content) {
                let penalty = self.penalty_for(artifact, rule.tag, rule.penalty);
                deducted = deducted.saturating_add(penalty);
                diagnostics.push(Diagnostic {
                    rule: rule.tag.to_string(),
                    severity: rule.severity,
                    message,
                    penalty,
                });
            }
        }

        let chars = content.chars().count();
        if chars > set.max_chars {
            diagnostics.push(Diagnostic {
                rule: OVERSIZE_RULE.to_string(),
                severity: Severity::Warning,
                message: format!("content is {chars} chars, above the {} char ceiling", set.max_chars),
                penalty: 0,
            });
        }

        let score = 100u32.saturating_sub(deducted) as u8;
        debug!(
            artifact = %artifact,
            score = score,
            failed_rules = diagnostics.len(),
            "Validated output"
        );

        ValidationReport { score, diagnostics }
    }
}
