//! Output validation for generated artifacts
//!
//! Each artifact type carries a declarative [`RuleSet`]. The
//! [`OutputValidator`] evaluates a rule set uniformly: start at 100, subtract
//! the penalty of every failed rule, clamp to `[0, 100]`. Scoring is a pure
//! function of `(artifact, content)`; the pass/fail threshold is applied by
//! the caller.

mod report;
mod rules;
mod validator;

pub use report::{Diagnostic, ValidationReport};
pub use rules::{Check, DEFAULT_MAX_CHARS, Rule, RuleSet, Severity, rule_set};
pub use validator::{EMPTY_OUTPUT_RULE, OVERSIZE_RULE, OutputValidator, default_threshold};
