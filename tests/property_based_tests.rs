//! Property-based tests for scoring, fallback ordering and version history.
//!
//! ## Configuration
//!
//! - `PROPTEST_CASES`: Number of test cases per property (default: 64)
//! - `PROPTEST_MAX_SHRINK_ITERS`: Max shrinking iterations on failure (default: 1000)
//!
//! ```bash
//! PROPTEST_CASES=256 cargo test --test property_based_tests
//! ```

use proptest::prelude::*;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use architect::types::{ArtifactType, ErrorKind};
use architect::{
    BackendRegistry, Candidate, Controller, Executor, GenerationRequest, InMemoryVersionStore,
    LlmError, OutputValidator, Resolver, RoutingTable, VersionMetadata, VersionStore,
    append_version,
};
use architect_config::Tier;
use architect_llm::testing::{ModelRouterBackend, ScriptedReply};

const DEFAULT_PROPTEST_CASES: u32 = 64;
const DEFAULT_MAX_SHRINK_ITERS: u32 = 1000;

fn proptest_config(max_cases: Option<u32>) -> ProptestConfig {
    let env_cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);

    let env_shrink_iters = env::var("PROPTEST_MAX_SHRINK_ITERS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_MAX_SHRINK_ITERS);

    let cases = match max_cases {
        Some(max) => env_cases.min(max),
        None => env_cases,
    };

    ProptestConfig {
        cases,
        max_shrink_iters: env_shrink_iters,
        max_shrink_time: 30000,
        ..ProptestConfig::default()
    }
}

fn arb_artifact() -> impl Strategy<Value = ArtifactType> {
    prop::sample::select(ArtifactType::ALL.to_vec())
}

/// Text that looks vaguely like model output: mermaid keywords, braces,
/// markdown headings and noise.
fn arb_output() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("erDiagram".to_string()),
            Just("sequenceDiagram".to_string()),
            Just("graph TD".to_string()),
            Just("USER { int id }".to_string()),
            Just("A --> B".to_string()),
            Just("# Endpoints".to_string()),
            Just("GET /users".to_string()),
            Just("```".to_string()),
            Just("TBD".to_string()),
            Just("Here is the diagram:".to_string()),
            "[a-zA-Z0-9 {}()\\[\\]:;._-]{0,40}",
        ],
        0..12,
    )
    .prop_map(|lines| lines.join("\n"))
}

fn arb_whitespace() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just(' '), Just('\n'), Just('\t'), Just('\r')], 0..20)
        .prop_map(|chars| chars.into_iter().collect())
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Empty,
    Unreachable,
    Timeout,
}

fn arb_reply() -> impl Strategy<Value = Reply> {
    prop_oneof![
        3 => arb_output().prop_map(Reply::Text),
        1 => Just(Reply::Empty),
        1 => Just(Reply::Unreachable),
        1 => Just(Reply::Timeout),
    ]
}

fn scripted(reply: &Reply) -> ScriptedReply {
    match reply {
        Reply::Text(text) => ScriptedReply::text(text.clone()),
        Reply::Empty => ScriptedReply::text(""),
        Reply::Unreachable => ScriptedReply::error(LlmError::Transport("connection refused".into())),
        Reply::Timeout => ScriptedReply::error(LlmError::Timeout {
            duration: Duration::from_secs(1),
        }),
    }
}

fn controller_for(artifact: ArtifactType, replies: &[Reply], max_attempts: u32) -> Controller {
    let mut backend = ModelRouterBackend::new("ollama");
    let mut candidates = Vec::new();
    for (i, reply) in replies.iter().enumerate() {
        let model = format!("model-{i}");
        backend = backend.route(model.clone(), [scripted(reply)]);
        candidates.push(Candidate::new(format!("local:{model}"), Tier::Local, "ollama", model));
    }
    let executor = Executor::new(
        BackendRegistry::new().with_backend(Arc::new(backend)),
        Arc::new(OutputValidator::new()),
        Duration::from_secs(5),
    );
    Controller::new(
        Resolver::from_table(RoutingTable::default().with_entry(artifact, candidates)),
        executor,
        Arc::new(InMemoryVersionStore::new()),
    )
    .with_max_attempts(max_attempts)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(proptest_config(None))]

    #[test]
    fn prop_validation_is_deterministic(artifact in arb_artifact(), content in arb_output()) {
        let validator = OutputValidator::new();
        let first = validator.validate(artifact, &content);
        let second = validator.validate(artifact, &content);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_blank_output_scores_zero(artifact in arb_artifact(), blank in arb_whitespace()) {
        let report = OutputValidator::new().validate(artifact, &blank);
        prop_assert_eq!(report.score, 0);
        prop_assert!(!report.passes(1));
    }

    #[test]
    fn prop_score_is_100_minus_penalties(artifact in arb_artifact(), content in arb_output()) {
        prop_assume!(!content.trim().is_empty());
        let report = OutputValidator::new().validate(artifact, &content);
        let deducted: u32 = report.diagnostics.iter().map(|d| d.penalty).sum();
        prop_assert!(report.score <= 100);
        prop_assert_eq!(u32::from(report.score), 100u32.saturating_sub(deducted));
        prop_assert_eq!(report.score == 100, report.diagnostics.iter().all(|d| d.is_warning()));
    }

    #[test]
    fn prop_threshold_comparison_is_inclusive(artifact in arb_artifact(), content in arb_output()) {
        let report = OutputValidator::new().validate(artifact, &content);
        prop_assert!(report.passes(report.score));
        if report.score < 100 {
            prop_assert!(!report.passes(report.score + 1));
        }
    }
}

proptest! {
    #![proptest_config(proptest_config(Some(32)))]

    #[test]
    fn prop_attempts_are_sequential_and_bounded(
        artifact in arb_artifact(),
        replies in prop::collection::vec(arb_reply(), 1..6),
        max_attempts in 1u32..6,
        threshold in 0u8..=100,
    ) {
        let controller = controller_for(artifact, &replies, max_attempts);
        let request = GenerationRequest::new(artifact, "prompt").with_threshold(threshold);
        let outcome = runtime().block_on(controller.generate(request));

        let attempts = match &outcome {
            Ok(result) => result.attempts().to_vec(),
            Err(err) => {
                prop_assert_eq!(err.kind(), ErrorKind::GenerationExhausted);
                err.attempts().to_vec()
            }
        };

        let ceiling = replies.len().min(max_attempts as usize);
        prop_assert!(!attempts.is_empty());
        prop_assert!(attempts.len() <= ceiling);
        for (i, attempt) in attempts.iter().enumerate() {
            prop_assert_eq!(attempt.index, i);
            prop_assert_eq!(&attempt.candidate, &format!("local:model-{i}"));
            if attempt.failure.is_some() {
                prop_assert_eq!(attempt.score, 0);
            }
        }
        // Only the last attempt may pass.
        prop_assert!(attempts[..attempts.len() - 1].iter().all(|a| !a.passed));

        match outcome {
            Ok(result) => {
                let kept = result.accepted_attempt().unwrap();
                prop_assert!(kept.is_usable());
                let best = attempts.iter().filter(|a| a.is_usable()).map(|a| a.score).max().unwrap();
                prop_assert_eq!(kept.score, best);
            }
            Err(_) => {
                prop_assert!(attempts.iter().all(|a| !a.is_usable()));
            }
        }
    }

    #[test]
    fn prop_history_versions_are_contiguous(
        contents in prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c")], 1..20),
    ) {
        let store = InMemoryVersionStore::new();
        let mut expected_len = 0u64;
        let mut current: Option<&str> = None;

        for content in &contents {
            let outcome = append_version(&store, ArtifactType::Erd, content, VersionMetadata::default(), 0).unwrap();
            if current == Some(*content) {
                prop_assert!(!outcome.is_created());
            } else {
                expected_len += 1;
                prop_assert_eq!(outcome.version(), expected_len);
            }
            current = Some(*content);
        }

        let history = store.list(ArtifactType::Erd).unwrap();
        let versions: Vec<u64> = history.iter().map(|r| r.version).collect();
        prop_assert_eq!(versions, (1..=expected_len).collect::<Vec<_>>());
        prop_assert_eq!(history.iter().filter(|r| r.is_current).count(), 1);
        prop_assert_eq!(
            store.get_current(ArtifactType::Erd).unwrap().unwrap().content,
            current.unwrap().to_string()
        );
    }
}
