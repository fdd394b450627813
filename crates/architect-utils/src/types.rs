//! Shared vocabulary types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Category of generated output.
///
/// The set is closed: routing tables, rule sets and version stores are all
/// keyed by this tag, and an unknown tag is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    /// Mermaid entity-relationship diagram
    Erd,
    /// System architecture diagram (mermaid graph/flowchart)
    Architecture,
    /// Mermaid sequence diagram
    Sequence,
    /// Mermaid class diagram
    Class,
    /// Mermaid state diagram
    State,
    /// Generic mermaid flowchart
    Flowchart,
    /// Markdown API documentation
    ApiDocs,
    /// Source code scaffold in fenced blocks
    CodePrototype,
    /// Jira-style user stories with acceptance criteria
    JiraStories,
    /// Markdown development workflow
    Workflows,
}

impl ArtifactType {
    /// Every artifact type, in declaration order.
    pub const ALL: [ArtifactType; 10] = [
        ArtifactType::Erd,
        ArtifactType::Architecture,
        ArtifactType::Sequence,
        ArtifactType::Class,
        ArtifactType::State,
        ArtifactType::Flowchart,
        ArtifactType::ApiDocs,
        ArtifactType::CodePrototype,
        ArtifactType::JiraStories,
        ArtifactType::Workflows,
    ];

    /// Stable snake_case tag used in config keys, file names and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Erd => "erd",
            Self::Architecture => "architecture",
            Self::Sequence => "sequence",
            Self::Class => "class",
            Self::State => "state",
            Self::Flowchart => "flowchart",
            Self::ApiDocs => "api_docs",
            Self::CodePrototype => "code_prototype",
            Self::JiraStories => "jira_stories",
            Self::Workflows => "workflows",
        }
    }

    /// True for the mermaid diagram family.
    #[must_use]
    pub const fn is_diagram(self) -> bool {
        matches!(
            self,
            Self::Erd
                | Self::Architecture
                | Self::Sequence
                | Self::Class
                | Self::State
                | Self::Flowchart
        )
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag does not name a known artifact type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown artifact type '{tag}'")]
pub struct UnknownArtifactType {
    pub tag: String,
}

impl FromStr for ArtifactType {
    type Err = UnknownArtifactType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ArtifactType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownArtifactType { tag: s.to_string() })
    }
}

/// Error kinds surfaced in attempt diagnostics, events and failure reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownArtifactType,
    BackendUnreachable,
    EmptyOutput,
    Timeout,
    GenerationExhausted,
    VersioningConflict,
    Cancelled,
    Configuration,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnknownArtifactType => "UnknownArtifactType",
            Self::BackendUnreachable => "BackendUnreachable",
            Self::EmptyOutput => "EmptyOutput",
            Self::Timeout => "Timeout",
            Self::GenerationExhausted => "GenerationExhausted",
            Self::VersioningConflict => "VersioningConflict",
            Self::Cancelled => "Cancelled",
            Self::Configuration => "Configuration",
            Self::Internal => "Internal",
        };
        f.write_str(s)
    }
}

/// Where a configuration value came from, for status display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from a configuration file.
    ConfigFile(PathBuf),
    /// Value provided programmatically.
    Programmatic,
    /// Built-in default value (lowest precedence).
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Defaults => write!(f, "default"),
        }
    }
}
