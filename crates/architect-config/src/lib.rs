//! Configuration management for architect
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. The TOML file carries `[defaults]`, `[providers.*]`,
//! `[routing.<artifact>]` and `[validation.<artifact>]` sections.

mod discovery;
mod model;
mod routing;
mod validation;

pub use discovery::{CONFIG_ENV_VAR, describe_sources};
pub use model::*;
pub use routing::builtin_candidates;
pub use architect_utils::types::ConfigSource;
