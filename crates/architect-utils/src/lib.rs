//! Foundation utilities shared by every architect crate.
//!
//! Nothing in here knows about backends, rules or stores; it carries the
//! vocabulary (artifact types, error kinds), the error taxonomy, and the
//! small pieces of infrastructure (logging, atomic writes, redaction).

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod hashing;
pub mod logging;
pub mod redaction;
pub mod types;
