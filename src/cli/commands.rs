//! Command implementations
//!
//! Each command prints its own output and maps failures to an [`ExitCode`].

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Display;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::types::ArtifactType;
use crate::{
    BackendRegistry, Config, Controller, ExitCode, FileVersionStore, GenerationEvent,
    GenerationRequest, GenerationResult, OutputValidator, RoutingTable, ValidationReport,
    VersionRecord, VersionStore, default_threshold,
};
use architect_config::describe_sources;

fn fail(err: impl Display, code: ExitCode) -> ExitCode {
    eprintln!("✗ {err}");
    code
}

fn parse_artifact(tag: &str) -> Result<ArtifactType, ExitCode> {
    tag.parse::<ArtifactType>().map_err(|e| {
        let known: Vec<&str> = ArtifactType::ALL.iter().map(|a| a.as_str()).collect();
        fail(
            format!("{e}. Known types: {}", known.join(", ")),
            ExitCode::UNKNOWN_ARTIFACT,
        )
    })
}

fn open_store(config: &Config) -> Result<FileVersionStore, ExitCode> {
    FileVersionStore::open(&config.versions_dir()).map_err(|e| {
        let code = ExitCode::for_kind(e.kind());
        fail(e, code)
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| fail(format!("Failed to serialize output: {e}"), ExitCode::INTERNAL))?;
    println!("{json}");
    Ok(())
}

fn read_prompt(prompt_file: Option<&Path>) -> Result<String> {
    let prompt = match prompt_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read prompt from stdin")?;
            buf
        }
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("Prompt is empty; pass --prompt-file or pipe text on stdin");
    }
    Ok(prompt)
}

fn render_event(event: &GenerationEvent) -> String {
    match event {
        GenerationEvent::Started {
            artifact,
            candidates,
            ..
        } => format!("→ Generating {artifact} ({} candidate(s): {})", candidates.len(), candidates.join(", ")),
        GenerationEvent::Attempt {
            index,
            candidate,
            score,
            passed,
            failure,
            ..
        } => {
            let mark = if *passed { "✓" } else { "✗" };
            match failure {
                Some(kind) => format!("  {mark} [{}] {candidate}: {kind}", index + 1),
                None => format!("  {mark} [{}] {candidate}: score {score}", index + 1),
            }
        }
        GenerationEvent::Completed {
            status,
            version,
            candidate,
            score,
            ..
        } => format!("✓ {status}: v{version} from {candidate} (score {score})"),
        GenerationEvent::Failed { kind, reason, .. } => format!("✗ {kind}: {reason}"),
    }
}

pub async fn generate(
    config: &Config,
    tag: &str,
    prompt_file: Option<&Path>,
    threshold: Option<u8>,
    json: bool,
) -> Result<(), ExitCode> {
    let artifact = parse_artifact(tag)?;
    let prompt = read_prompt(prompt_file).map_err(|e| fail(format!("{e:#}"), ExitCode::CLI_ARGS))?;
    let store = open_store(config)?;

    let controller = Controller::from_config(config, BackendRegistry::from_config(config), Arc::new(store));
    let mut request = GenerationRequest::new(artifact, prompt);
    if let Some(threshold) = threshold {
        request = request.with_threshold(threshold);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current attempt...");
            ctrl_c.cancel();
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<GenerationEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("{}", render_event(&event));
        }
    });

    let outcome = controller.run(request, &tx, &cancel).await;
    drop(tx);
    let _ = printer.await;

    match outcome {
        Ok(result) => {
            if json {
                print_json(&result)
            } else {
                print_result(&result);
                Ok(())
            }
        }
        Err(err) => {
            let code = ExitCode::for_kind(err.kind());
            if json {
                print_json(&err.to_report())?;
            } else {
                for attempt in err.attempts() {
                    eprintln!(
                        "  [{}] {}: {}",
                        attempt.index + 1,
                        attempt.candidate,
                        attempt.diagnostics.join("; ")
                    );
                }
            }
            Err(code)
        }
    }
}

fn print_result(result: &GenerationResult) {
    println!("{}", result.content());
    if !result.version_created() {
        eprintln!("(content unchanged; v{} stays current)", result.version());
    }
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    artifact: ArtifactType,
    threshold: u8,
    passed: bool,
    #[serde(flatten)]
    report: &'a ValidationReport,
}

pub fn validate(
    config: &Config,
    tag: &str,
    file: &Path,
    threshold: Option<u8>,
    json: bool,
) -> Result<(), ExitCode> {
    let artifact = parse_artifact(tag)?;
    let content = std::fs::read_to_string(file)
        .map_err(|e| fail(format!("Failed to read {}: {e}", file.display()), ExitCode::CLI_ARGS))?;

    let threshold = threshold
        .or_else(|| config.threshold_for(artifact))
        .unwrap_or_else(|| default_threshold(artifact));
    let report = OutputValidator::from_config(config).validate(artifact, &content);
    let passed = report.passes(threshold);

    if json {
        return print_json(&ValidateOutput {
            artifact,
            threshold,
            passed,
            report: &report,
        });
    }

    let verdict = if passed { "pass" } else { "below threshold" };
    println!("{artifact}: score {} / threshold {threshold} ({verdict})", report.score);
    for line in report.messages() {
        println!("  - {line}");
    }
    Ok(())
}

pub fn candidates(config: &Config, tag: &str) -> Result<(), ExitCode> {
    let artifact = parse_artifact(tag)?;
    let candidates = RoutingTable::from_config(config)
        .resolve(artifact)
        .map_err(|e| fail(&e, ExitCode::for_kind(e.kind())))?;

    let default_timeout = config.attempt_timeout().as_secs();
    for (i, c) in candidates.iter().enumerate() {
        println!(
            "{:>2}. {:<22} {:<6} {}/{} (timeout {}s)",
            i + 1,
            c.id,
            c.tier.to_string(),
            c.provider,
            c.model,
            c.timeout_secs.unwrap_or(default_timeout)
        );
    }
    Ok(())
}

fn render_version(record: &VersionRecord) -> String {
    let marker = if record.is_current { "*" } else { " " };
    let meta = &record.metadata;
    format!(
        "{marker} v{:<4} {}  {:<18} {:<20} score {:>3}  {}",
        record.version,
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        meta.status.as_deref().unwrap_or("-"),
        meta.candidate.as_deref().unwrap_or("-"),
        meta.score.map_or_else(|| "-".to_string(), |s| s.to_string()),
        &record.content_hash[..record.content_hash.len().min(12)]
    )
}

pub fn versions(config: &Config, tag: &str, json: bool) -> Result<(), ExitCode> {
    let artifact = parse_artifact(tag)?;
    let store = open_store(config)?;
    let records = store
        .list(artifact)
        .map_err(|e| fail(&e, ExitCode::for_kind(e.kind())))?;

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No versions for {artifact}");
        return Ok(());
    }
    for record in &records {
        println!("{}", render_version(record));
    }
    Ok(())
}

pub fn restore(config: &Config, tag: &str, version: u64) -> Result<(), ExitCode> {
    let artifact = parse_artifact(tag)?;
    let store = open_store(config)?;
    let record = store
        .restore(artifact, version)
        .map_err(|e| fail(&e, ExitCode::for_kind(e.kind())))?;
    println!("✓ {artifact} v{} is now current", record.version);
    Ok(())
}

pub fn show_config(config: &Config) -> Result<(), ExitCode> {
    println!("max_attempts          = {}", config.max_attempts());
    println!("attempt_timeout_secs  = {}", config.attempt_timeout().as_secs());
    println!("commit_retries        = {}", config.commit_retries());
    println!("versions_dir          = {}", config.versions_dir().display());
    println!();
    for (key, source) in describe_sources(config) {
        println!("{key:<22}  from {source}");
    }
    Ok(())
}
