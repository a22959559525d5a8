use crate::config::{ExtractConfig, NormalizeConfig, ProbeConfig, SearchConfig};
use crate::engine::load_image;
use crate::engines::EngineRegistry;
use crate::input::{read_blocks, read_json, read_keywords};
use crate::matcher::{anchor_window, find_matches};
use crate::normalize::{self, select_page, FieldHints, NormalizeOutcome};
use crate::probe::describe;
use crate::report::{render, ExtractionReport, OutputFormat, SearchReport, ShapeReport};
use crate::transcript::{write_artifact, AcceptancePolicy, Transcript};
use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

/// Recognize one image and report what the engine returned
pub fn extract(config: ExtractConfig, format: OutputFormat) -> anyhow::Result<()> {
    // Load the image first so a bad path fails before any model download
    let image = load_image(&config.image)?;

    let registry = EngineRegistry::new()?;
    let engine = registry.select(config.engine.as_deref())?;
    tracing::info!("Using {} engine: {}", engine.name(), engine.description());

    let start = Instant::now();
    let raw = engine.detect(&image, &config.options)?;
    tracing::info!(
        "{} finished in {}ms",
        engine.name(),
        start.elapsed().as_millis()
    );

    let source = config.image.display().to_string();
    finish(
        &raw,
        &source,
        Some(engine.name()),
        &config.hints,
        &config.policy,
        Some(config.output.as_path()),
        config.min_chars,
        format,
    )
}

/// Normalize a saved result dump
pub fn normalize(config: NormalizeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let raw = load_result(&config.input, config.page)?;
    let source = config.input.display().to_string();
    finish(
        &raw,
        &source,
        None,
        &config.hints,
        &config.policy,
        config.output.as_deref(),
        config.min_chars,
        format,
    )
}

/// Describe the shape of a saved result dump
pub fn probe(config: ProbeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let raw = load_result(&config.input, config.page)?;
    let summary = describe(&raw, &config.attribute_container, config.preview);
    let report = ShapeReport {
        source: config.input.display().to_string(),
        summary: &summary,
    };
    emit(&report, format)
}

/// Search text blocks for keywords
pub fn search(config: SearchConfig, format: OutputFormat) -> anyhow::Result<()> {
    let blocks = read_blocks(&config.blocks)?;

    let mut keywords = config.keywords;
    if let Some(path) = &config.keywords_file {
        keywords.extend(read_keywords(path)?);
    }
    if keywords.is_empty() {
        tracing::warn!("No keywords given, only the anchor window will be reported");
    }

    let matches = find_matches(&blocks, &keywords);
    let window = anchor_window(&blocks, &config.anchor, config.span);
    tracing::info!(
        "{} matches across {} blocks, anchor at {:?}",
        matches.total,
        blocks.len(),
        window.anchor_index()
    );

    let report = SearchReport {
        block_count: blocks.len(),
        keywords: &keywords,
        matches: &matches,
        window: &window,
    };
    emit(&report, format)
}

fn load_result(path: &Path, page: Option<usize>) -> anyhow::Result<Value> {
    let raw = read_json(path)?;
    match page {
        Some(index) => select_page(raw, index)
            .with_context(|| format!("Failed to select page from {}", path.display())),
        None => Ok(raw),
    }
}

#[allow(clippy::too_many_arguments)]
fn finish(
    raw: &Value,
    source: &str,
    engine: Option<&str>,
    hints: &FieldHints,
    policy: &AcceptancePolicy,
    output: Option<&Path>,
    min_chars: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let outcome: NormalizeOutcome = normalize::normalize(raw, hints);
    let transcript = Transcript::build(&outcome.records, policy);
    let substantial = transcript.is_substantial(min_chars);
    tracing::info!(
        "Normalized {}: success={}, {} records, {} accepted",
        source,
        outcome.is_success(),
        outcome.records.len(),
        transcript.accepted.len()
    );

    let artifact = match output {
        Some(path) if substantial => {
            write_artifact(path, &transcript.combined)
                .with_context(|| format!("Failed to save transcript to {}", path.display()))?;
            Some(path)
        }
        _ => None,
    };

    let report = ExtractionReport {
        source: source.to_string(),
        engine,
        outcome: &outcome,
        transcript: &transcript,
        substantial,
        artifact,
    };
    emit(&report, format)
}

fn emit<T>(report: &T, format: OutputFormat) -> anyhow::Result<()>
where
    T: serde::Serialize + std::fmt::Display,
{
    let rendered = render(report, format).context("Failed to render report")?;
    print!("{}", rendered);
    if format == OutputFormat::Json {
        println!();
    }
    Ok(())
}
