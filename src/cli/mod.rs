//! Command-line interface for architect
//!
//! - `args`: clap definitions
//! - `run`: entry point, config discovery, runtime setup
//! - `commands`: command implementations

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands};
pub use run::run;
