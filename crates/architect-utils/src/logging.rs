//! Tracing initialization and structured logging helpers.

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable compact lines
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode enables debug output for
/// the architect crates and span close events (which carry durations).
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("architect=debug,info")
            } else {
                EnvFilter::try_new("architect=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if verbose {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_span_events(span_events)
                        .with_current_span(true),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(use_color())
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_span_events(span_events)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span covering one generation request.
pub fn generation_span(request_id: &str, artifact: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "generation",
        request_id = %request_id,
        artifact = %artifact,
    )
}

/// Span covering one candidate attempt.
pub fn attempt_span(candidate: &str, index: usize) -> tracing::Span {
    span!(
        Level::DEBUG,
        "attempt",
        candidate = %candidate,
        index = index,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Whichever call installs the global subscriber first, a later one errors.
        let _ = init_tracing(false, LogFormat::Compact);
        assert!(init_tracing(true, LogFormat::Json).is_err());
    }

    #[test]
    fn test_spans_carry_names() {
        let _ = init_tracing(true, LogFormat::Compact);
        let span = generation_span("gen-1", "erd");
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "generation");
        }
        let span = attempt_span("local:llama3", 0);
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "attempt");
        }
    }
}
