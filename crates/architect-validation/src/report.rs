use serde::{Deserialize, Serialize};

use crate::rules::Severity;

/// One finding from a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Tag of the rule that produced this finding
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    /// Points deducted; always zero for warnings, and zero for failed rules
    /// whose penalty is overridden to 0
    pub penalty: u32,
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Score plus the diagnostics that explain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub score: u8,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// Diagnostic messages in evaluation order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| {
                if d.is_warning() {
                    format!("warning: {}", d.message)
                } else {
                    format!("{} (-{})", d.message, d.penalty)
                }
            })
            .collect()
    }

    /// True when every finding is an informational warning.
    pub fn warnings_only(&self) -> bool {
        self.diagnostics.iter().all(Diagnostic::is_warning)
    }

    pub fn passes(&self, threshold: u8) -> bool {
        self.score >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_mark_warnings() {
        let report = ValidationReport {
            score: 95,
            diagnostics: vec![
                Diagnostic {
                    rule: "relationships".into(),
                    severity: Severity::Soft,
                    message: "no relationship lines".into(),
                    penalty: 5,
                },
                Diagnostic {
                    rule: "oversize".into(),
                    severity: Severity::Warning,
                    message: "content is long".into(),
                    penalty: 0,
                },
            ],
        };
        assert_eq!(
            report.messages(),
            vec!["no relationship lines (-5)", "warning: content is long"]
        );
        assert!(!report.warnings_only());
        assert!(report.passes(95));
        assert!(!report.passes(96));
    }

    #[test]
    fn test_zero_penalty_failure_is_not_a_warning() {
        let report = ValidationReport {
            score: 100,
            diagnostics: vec![Diagnostic {
                rule: "header".into(),
                severity: Severity::Required,
                message: "missing erDiagram header".into(),
                penalty: 0,
            }],
        };
        assert!(!report.diagnostics[0].is_warning());
        assert!(!report.warnings_only());
        assert_eq!(report.messages(), vec!["missing erDiagram header (-0)"]);
    }
}
