//! Declarative rule sets per artifact type

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use architect_utils::types::ArtifactType;

/// Content longer than this is flagged (never penalized).
pub const DEFAULT_MAX_CHARS: usize = 200_000;

/// Patterns that indicate the model talked about the artifact instead of
/// producing it.
static META_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)^(I('ve| have| will| am)|Here('s| is)|This is a|Let me)").unwrap(),
        Regex::new(r"(?i)^.{0,50}I('ve| have) (created|generated|produced|written|made)").unwrap(),
        Regex::new(r"(?i)^(Perfect!|Great!|Excellent!|Certainly!|Sure!|Absolutely!)").unwrap(),
        Regex::new(r"(?i)^.{0,30}(based on (the|your)|as (you )?requested)").unwrap(),
        Regex::new(r"(?i)^.{0,30}I('ll| will) (create|generate|write|produce)").unwrap(),
    ]
});

static RULE_SETS: LazyLock<Vec<RuleSet>> =
    LazyLock::new(|| ArtifactType::ALL.iter().map(|a| build_rule_set(*a)).collect());

/// How much a failed rule matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Structural marker the artifact cannot do without (15-30 points)
    Required,
    /// Quality smell (3-10 points)
    Soft,
    /// Informational only, never costs points
    Warning,
}

/// What a rule looks for.
#[derive(Debug, Clone)]
pub enum Check {
    /// Some line starts with one of these tokens (code fences are skipped).
    AnyHeader(&'static [&'static str]),
    /// `pattern` matches at least `min` times.
    MinMatches {
        pattern: Regex,
        min: usize,
        what: &'static str,
    },
    /// Delimiters pair up and never close before they open. Lines matching
    /// `ignore` are skipped (ERD cardinality markers reuse `{` and `}`).
    Balanced {
        open: char,
        close: char,
        ignore: Option<Regex>,
    },
    /// Lines opening a block match lines closing one.
    BalancedKeywords { open: Regex, close: Regex },
    MinLines(usize),
    MinChars(usize),
    /// `pattern` must not appear.
    Forbidden { pattern: Regex, what: &'static str },
    /// Leading meta-commentary such as "Here is the diagram".
    MetaCommentary,
}

impl Check {
    /// Failure message, or `None` when the check passes.
    pub fn failure(&self, content: &str) -> Option<String> {
        match self {
            Check::AnyHeader(headers) => {
                let found = content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.starts_with("```"))
                    .any(|l| headers.iter().any(|h| l.starts_with(h)));
                (!found).then(|| format!("missing required header (one of: {})", headers.join(", ")))
            }
            Check::MinMatches { pattern, min, what } => {
                let count = pattern.find_iter(content).count();
                (count < *min).then(|| format!("expected at least {min} {what}, found {count}"))
            }
            Check::Balanced {
                open,
                close,
                ignore,
            } => {
                let mut depth: i64 = 0;
                for line in content.lines() {
                    if ignore.as_ref().is_some_and(|re| re.is_match(line)) {
                        continue;
                    }
                    for c in line.chars() {
                        if c == *open {
                            depth += 1;
                        } else if c == *close {
                            depth -= 1;
                            if depth < 0 {
                                return Some(format!("unbalanced '{open}{close}': '{close}' before '{open}'"));
                            }
                        }
                    }
                }
                (depth != 0).then(|| format!("unbalanced '{open}{close}': {depth} left open"))
            }
            Check::BalancedKeywords { open, close } => {
                let (mut opened, mut closed) = (0usize, 0usize);
                for line in content.lines().map(str::trim) {
                    if open.is_match(line) {
                        opened += 1;
                    } else if close.is_match(line) {
                        closed += 1;
                    }
                }
                (opened != closed)
                    .then(|| format!("unbalanced blocks: {opened} opened, {closed} closed"))
            }
            Check::MinLines(min) => {
                let count = content.lines().filter(|l| !l.trim().is_empty()).count();
                (count < *min).then(|| format!("output too short: {count} lines, expected {min}"))
            }
            Check::MinChars(min) => {
                let count = content.trim().chars().count();
                (count < *min).then(|| format!("output too short: {count} chars, expected {min}"))
            }
            Check::Forbidden { pattern, what } => pattern
                .find(content)
                .map(|m| format!("contains {what}: '{}'", m.as_str())),
            Check::MetaCommentary => {
                let prefix: String = content.trim_start().chars().take(200).collect();
                META_PATTERNS
                    .iter()
                    .find_map(|p| p.find(&prefix))
                    .map(|m| format!("starts with meta-commentary: '{}'", m.as_str()))
            }
        }
    }
}

/// A tagged check with its penalty.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Stable identifier, used in diagnostics and `[validation.<type>.penalties]`
    pub tag: &'static str,
    pub severity: Severity,
    pub penalty: u32,
    pub check: Check,
}

impl Rule {
    fn required(tag: &'static str, penalty: u32, check: Check) -> Self {
        Self {
            tag,
            severity: Severity::Required,
            penalty,
            check,
        }
    }

    fn soft(tag: &'static str, penalty: u32, check: Check) -> Self {
        Self {
            tag,
            severity: Severity::Soft,
            penalty,
            check,
        }
    }
}

/// All rules for one artifact type.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub artifact: ArtifactType,
    pub rules: Vec<Rule>,
    pub max_chars: usize,
}

impl RuleSet {
    pub fn get(&self, tag: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.tag == tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.tag)
    }
}

/// Built-in rule set for an artifact type.
pub fn rule_set(artifact: ArtifactType) -> &'static RuleSet {
    &RULE_SETS[artifact as usize]
}

fn min_matches(pattern: &str, min: usize, what: &'static str) -> Check {
    Check::MinMatches {
        pattern: Regex::new(pattern).unwrap(),
        min,
        what,
    }
}

fn balanced(open: char, close: char) -> Check {
    Check::Balanced {
        open,
        close,
        ignore: None,
    }
}

fn subgraph_blocks() -> Check {
    Check::BalancedKeywords {
        open: Regex::new(r"^subgraph\b").unwrap(),
        close: Regex::new(r"^end$").unwrap(),
    }
}

// Mermaid edge operators: -->, ---, -.->, ==>, with optional |label|
const EDGE: &str = r"(-->|---|-\.->|==>)";

fn build_rule_set(artifact: ArtifactType) -> RuleSet {
    let mut rules = match artifact {
        ArtifactType::Erd => vec![
            Rule::required("header", 30, Check::AnyHeader(&["erDiagram"])),
            Rule::required(
                "entities",
                25,
                min_matches(r"(?m)^\s*[A-Za-z_][\w-]*\s*\{", 1, "entity blocks"),
            ),
            Rule::required(
                "balanced_braces",
                20,
                Check::Balanced {
                    open: '{',
                    close: '}',
                    ignore: Some(Regex::new(r"(--|\.\.)").unwrap()),
                },
            ),
            Rule::soft(
                "relationships",
                5,
                min_matches(r"[|}][|o](--|\.\.)[|o][|{]", 1, "relationship lines"),
            ),
        ],
        ArtifactType::Architecture => vec![
            Rule::required(
                "header",
                30,
                Check::AnyHeader(&["graph", "flowchart", "C4Context", "C4Container", "architecture-beta"]),
            ),
            Rule::required("connections", 20, min_matches(EDGE, 2, "connections")),
            Rule::required("balanced_brackets", 15, balanced('[', ']')),
            Rule::required("balanced_subgraphs", 15, subgraph_blocks()),
            Rule::soft("subgraphs", 5, min_matches(r"(?m)^\s*subgraph\b", 1, "subgraph groupings")),
        ],
        ArtifactType::Sequence => vec![
            Rule::required("header", 30, Check::AnyHeader(&["sequenceDiagram"])),
            Rule::required(
                "messages",
                25,
                min_matches(r"(->>|-->>|-x|--x|-\)|--\))", 1, "messages"),
            ),
            Rule::required(
                "balanced_blocks",
                15,
                Check::BalancedKeywords {
                    open: Regex::new(r"^(loop|alt|opt|par|critical|break|rect|box)\b").unwrap(),
                    close: Regex::new(r"^end$").unwrap(),
                },
            ),
            Rule::soft(
                "participants",
                3,
                min_matches(r"(?m)^\s*(participant|actor)\s", 1, "participant declarations"),
            ),
        ],
        ArtifactType::Class => vec![
            Rule::required("header", 30, Check::AnyHeader(&["classDiagram"])),
            Rule::required("classes", 25, min_matches(r"(?m)^\s*class\s+\w+", 1, "class declarations")),
            Rule::required("balanced_braces", 20, balanced('{', '}')),
            Rule::soft(
                "relationships",
                5,
                min_matches(r"(<\|--|--\|>|\*--|--\*|o--|--o|-->|<--|\.\.>|<\.\.|\.\.\|>|<\|\.\.)", 1, "relationships"),
            ),
        ],
        ArtifactType::State => vec![
            Rule::required("header", 30, Check::AnyHeader(&["stateDiagram-v2", "stateDiagram"])),
            Rule::required("transitions", 25, min_matches("-->", 1, "transitions")),
            Rule::required("balanced_braces", 15, balanced('{', '}')),
            Rule::soft("start_state", 5, min_matches(r"\[\*\]", 1, "start/end markers")),
        ],
        ArtifactType::Flowchart => vec![
            Rule::required("header", 30, Check::AnyHeader(&["flowchart", "graph"])),
            Rule::required("connections", 25, min_matches(EDGE, 1, "connections")),
            Rule::required("balanced_brackets", 15, balanced('[', ']')),
            Rule::required("balanced_subgraphs", 15, subgraph_blocks()),
            Rule::soft("decisions", 3, min_matches(r"\{[^{}]+\}", 1, "decision nodes")),
        ],
        ArtifactType::ApiDocs => vec![
            Rule::required("header", 20, Check::AnyHeader(&["#"])),
            Rule::required(
                "endpoints",
                25,
                min_matches(r"\b(GET|POST|PUT|PATCH|DELETE)\s+/", 1, "endpoint definitions"),
            ),
            Rule::soft("examples", 5, min_matches(r"(?m)^\s*```", 2, "code fence markers")),
            Rule::soft("min_lines", 5, Check::MinLines(15)),
        ],
        ArtifactType::CodePrototype => vec![
            Rule::required(
                "code_structure",
                25,
                min_matches(
                    r"(?m)^\s*(pub fn|fn|def|async def|class|function|import|from|export|interface|struct|package|public|const|let)\b",
                    2,
                    "code constructs",
                ),
            ),
            Rule::required("balanced_braces", 20, balanced('{', '}')),
            Rule::required("balanced_parens", 15, balanced('(', ')')),
            Rule::soft("min_lines", 5, Check::MinLines(10)),
        ],
        ArtifactType::JiraStories => vec![
            Rule::required("stories", 30, min_matches(r"(?i)\bas an? [^\n]+?\bi want\b", 1, "user stories")),
            Rule::required(
                "acceptance_criteria",
                20,
                min_matches(r"(?i)acceptance criteria", 1, "acceptance criteria sections"),
            ),
            Rule::soft("story_points", 3, min_matches(r"(?i)(story points|points:)", 1, "estimates")),
            Rule::soft("min_lines", 5, Check::MinLines(10)),
        ],
        ArtifactType::Workflows => vec![
            Rule::required("header", 20, Check::AnyHeader(&["#"])),
            Rule::required("steps", 25, min_matches(r"(?m)^\s*(\d+\.|[-*])\s+\S", 3, "steps")),
            Rule::soft("min_lines", 5, Check::MinLines(10)),
        ],
    };

    rules.extend(common_rules(artifact));

    RuleSet {
        artifact,
        rules,
        max_chars: DEFAULT_MAX_CHARS,
    }
}

/// Soft rules shared by every artifact type.
fn common_rules(artifact: ArtifactType) -> Vec<Rule> {
    let min_chars = if artifact.is_diagram() { 20 } else { 80 };
    vec![
        Rule::soft("short_output", 5, Check::MinChars(min_chars)),
        Rule::soft(
            "placeholders",
            5,
            Check::Forbidden {
                pattern: Regex::new(r"(?i)(lorem ipsum|\bTBD\b|\[(insert|placeholder)[^\]]*\]|<placeholder>)").unwrap(),
                what: "placeholder text",
            },
        ),
        Rule::soft("meta_commentary", 5, Check::MetaCommentary),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_artifact_has_a_rule_set() {
        for artifact in ArtifactType::ALL {
            let set = rule_set(artifact);
            assert_eq!(set.artifact, artifact);
            assert!(!set.rules.is_empty());
        }
    }

    #[test]
    fn test_penalties_stay_in_severity_bands() {
        for artifact in ArtifactType::ALL {
            for rule in &rule_set(artifact).rules {
                match rule.severity {
                    Severity::Required => assert!((15..=30).contains(&rule.penalty), "{}", rule.tag),
                    Severity::Soft => assert!((3..=10).contains(&rule.penalty), "{}", rule.tag),
                    Severity::Warning => assert_eq!(rule.penalty, 0),
                }
            }
        }
    }

    #[test]
    fn test_tags_unique_within_set() {
        for artifact in ArtifactType::ALL {
            let mut tags: Vec<_> = rule_set(artifact).tags().collect();
            let before = tags.len();
            tags.sort_unstable();
            tags.dedup();
            assert_eq!(before, tags.len(), "duplicate tag in {artifact}");
        }
    }

    #[test]
    fn test_header_skips_code_fences() {
        let check = Check::AnyHeader(&["erDiagram"]);
        assert!(check.failure("```mermaid\nerDiagram\n```").is_none());
        assert!(check.failure("```erDiagram").is_some());
    }

    #[test]
    fn test_balanced_detects_early_close() {
        let check = balanced('{', '}');
        assert!(check.failure("} {").is_some());
        assert!(check.failure("{ { } }").is_none());
        assert!(check.failure("{ {").unwrap().contains("2 left open"));
    }

    #[test]
    fn test_sequence_box_groups_close_with_end() {
        let rule = rule_set(ArtifactType::Sequence).get("balanced_blocks").unwrap();
        let content = "sequenceDiagram\n    box Aqua Frontend\n    participant A\n    participant B\n    end\n    A->>B: hello";
        assert!(rule.check.failure(content).is_none());

        let unclosed = "sequenceDiagram\n    box Aqua Frontend\n    participant A\n    A->>A: hello";
        assert!(rule.check.failure(unclosed).is_some());
    }

    #[test]
    fn test_erd_balance_ignores_cardinality_markers() {
        let rule = rule_set(ArtifactType::Erd).get("balanced_braces").unwrap();
        let content = "erDiagram\nUSER ||--o{ ORDER : places\nUSER { int id }";
        assert!(rule.check.failure(content).is_none());
    }

    #[test]
    fn test_sequence_blocks_balance() {
        let rule = rule_set(ArtifactType::Sequence).get("balanced_blocks").unwrap();
        assert!(rule.check.failure("loop every minute\nA->>B: ping\nend").is_none());
        assert!(rule.check.failure("alt ok\nA->>B: x\nelse fail\nA->>B: y").is_some());
    }

    #[test]
    fn test_meta_commentary_detection() {
        assert!(Check::MetaCommentary.failure("Sure! Here is your diagram").is_some());
        assert!(Check::MetaCommentary.failure("  I've created the ERD below").is_some());
        assert!(Check::MetaCommentary.failure("erDiagram\nUSER { int id }").is_none());
    }

    #[test]
    fn test_forbidden_reports_match() {
        let rule = rule_set(ArtifactType::Workflows).get("placeholders").unwrap();
        let msg = rule.check.failure("1. Deploy to [insert environment]").unwrap();
        assert!(msg.contains("[insert environment]"));
    }
}
