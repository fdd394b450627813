//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// architect - generate diagrams, docs and code scaffolds with model fallback
#[derive(Parser, Debug)]
#[command(name = "architect")]
#[command(about = "Generate development artifacts with local-first model fallback, scoring and versioning")]
#[command(long_about = r#"
architect turns a prompt into a development artifact (mermaid diagrams, API
docs, code scaffolds, user stories). Candidate models are tried one at a time,
local first; every output is scored against the artifact's structural rules
and the first one to clear the threshold is versioned.

EXAMPLES:
  # Generate an ERD from meeting notes
  architect generate erd --prompt-file notes.md

  # Pipe a prompt and get a JSON result with the attempt history
  cat notes.md | architect generate sequence --json

  # Score an existing file without calling any model
  architect validate erd docs/schema.mmd

  # Inspect and restore history
  architect versions erd
  architect restore erd 3

CONFIGURATION:
  Precedence: CLI flags > config file > defaults
  The config file is discovered by searching upward from CWD for
  .architect/config.toml; ARCHITECT_CONFIG or --config pin an explicit path.

ARTIFACT TYPES:
  erd, architecture, sequence, class, state, flowchart,
  api_docs, code_prototype, jira_stories, workflows
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Maximum attempts per generation request
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Default per-attempt timeout in seconds
    #[arg(long, global = true)]
    pub attempt_timeout: Option<u64>,

    /// Directory holding version history
    #[arg(long, global = true)]
    pub versions_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an artifact and commit it as a new version
    Generate {
        /// Artifact type (e.g. erd, sequence, api_docs)
        artifact: String,

        /// Read the prompt from a file instead of stdin
        #[arg(long)]
        prompt_file: Option<PathBuf>,

        /// Pass threshold (0-100) for this request only
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        /// Print the result (or failure report) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a file as an artifact without calling any model
    Validate {
        artifact: String,

        file: PathBuf,

        /// Threshold to compare against (defaults to the configured one)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        #[arg(long)]
        json: bool,
    },

    /// Show the ordered candidate list for an artifact type
    Candidates { artifact: String },

    /// List the version history of an artifact type
    Versions {
        artifact: String,

        #[arg(long)]
        json: bool,
    },

    /// Make an earlier version current again
    Restore { artifact: String, version: u64 },

    /// Show effective configuration values and where they came from
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_parses_with_globals() {
        let cli = Cli::try_parse_from([
            "architect",
            "--max-attempts",
            "2",
            "generate",
            "erd",
            "--threshold",
            "80",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.max_attempts, Some(2));
        match cli.command {
            Commands::Generate {
                artifact,
                threshold,
                json,
                prompt_file,
            } => {
                assert_eq!(artifact, "erd");
                assert_eq!(threshold, Some(80));
                assert!(json);
                assert!(prompt_file.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let err = Cli::try_parse_from(["architect", "generate", "erd", "--threshold", "101"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_global_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["architect", "versions", "erd", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_restore_requires_version() {
        assert!(Cli::try_parse_from(["architect", "restore", "erd"]).is_err());
        let cli = Cli::try_parse_from(["architect", "restore", "erd", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Restore { version: 3, .. }));
    }
}
