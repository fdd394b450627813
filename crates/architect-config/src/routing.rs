//! Built-in model priority table.
//!
//! Local models come first so the cheap path is always tried before a hosted
//! API is billed. Diagram types lean on general chat models; code and docs
//! prefer a coder model locally.

use architect_utils::types::ArtifactType;

use crate::model::{CandidateConfig, Tier};

fn candidate(id: &str, provider: &str, model: &str, tier: Tier) -> CandidateConfig {
    CandidateConfig {
        id: id.to_string(),
        provider: provider.to_string(),
        model: model.to_string(),
        tier,
        timeout_secs: None,
    }
}

/// Default candidate declarations for an artifact type, in preference order.
#[must_use]
pub fn builtin_candidates(artifact: ArtifactType) -> Vec<CandidateConfig> {
    let llama = candidate("local:llama3", "ollama", "llama3.1:8b", Tier::Local);
    let mistral = candidate("local:mistral", "ollama", "mistral:7b", Tier::Local);
    let coder = candidate("local:qwen-coder", "ollama", "qwen2.5-coder:7b", Tier::Local);
    let groq = candidate(
        "cloud:groq-llama",
        "groq",
        "llama-3.3-70b-versatile",
        Tier::Cloud,
    );
    let openai = candidate("cloud:gpt-4o-mini", "openai", "gpt-4o-mini", Tier::Cloud);
    let gemini = candidate(
        "cloud:gemini-flash",
        "gemini",
        "gemini-1.5-flash",
        Tier::Cloud,
    );

    match artifact {
        ArtifactType::Erd
        | ArtifactType::Architecture
        | ArtifactType::Sequence
        | ArtifactType::Class
        | ArtifactType::State
        | ArtifactType::Flowchart => vec![llama, mistral, groq, openai, gemini],
        ArtifactType::CodePrototype => vec![coder, llama, openai, gemini],
        ArtifactType::ApiDocs | ArtifactType::JiraStories | ArtifactType::Workflows => {
            vec![llama, openai, gemini]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_artifact_has_candidates() {
        for artifact in ArtifactType::ALL {
            assert!(
                !builtin_candidates(artifact).is_empty(),
                "{artifact} has no built-in candidates"
            );
        }
    }

    #[test]
    fn test_builtin_lists_declare_local_first() {
        for artifact in ArtifactType::ALL {
            let tiers: Vec<Tier> = builtin_candidates(artifact)
                .iter()
                .map(|c| c.tier)
                .collect();
            let mut sorted = tiers.clone();
            sorted.sort();
            assert_eq!(tiers, sorted, "{artifact} lists a cloud model before a local one");
        }
    }

    #[test]
    fn test_code_prototype_prefers_coder_model() {
        let list = builtin_candidates(ArtifactType::CodePrototype);
        assert_eq!(list[0].id, "local:qwen-coder");
    }
}
