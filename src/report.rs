//! Console presentation of probe, normalization and search results
//!
//! Core modules never print. Everything user-facing is rendered here, either
//! as human-readable text (via `Display`) or as pretty JSON.

use crate::matcher::{AnchorWindow, LineRole, MatchReport};
use crate::normalize::{Diagnostic, NormalizeOutcome};
use crate::probe::{truncate_chars, ShapeSummary};
use crate::transcript::Transcript;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Characters of the transcript shown as a sample
const SAMPLE_LIMIT: usize = 300;
/// Characters of a block shown next to a keyword hit
const BLOCK_LIMIT: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a report in the requested format
pub fn render<T>(report: &T, format: OutputFormat) -> Result<String, serde_json::Error>
where
    T: Serialize + fmt::Display,
{
    match format {
        OutputFormat::Text => Ok(report.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(report),
    }
}

#[derive(Debug, Serialize)]
pub struct ExtractionReport<'a> {
    pub source: String,
    pub engine: Option<&'a str>,
    pub outcome: &'a NormalizeOutcome,
    pub transcript: &'a Transcript,
    pub substantial: bool,
    pub artifact: Option<&'a Path>,
}

impl fmt::Display for ExtractionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source: {}", self.source)?;
        if let Some(engine) = self.engine {
            writeln!(f, "Engine: {}", engine)?;
        }

        let Some(strategy) = self.outcome.strategy else {
            match &self.outcome.failure {
                Some(failure) => writeln!(f, "No usable text recovered: {}", failure)?,
                None => writeln!(f, "No usable text recovered")?,
            }
            for diagnostic in &self.outcome.diagnostics {
                if let Diagnostic::StrategyFailed { strategy, reason } = diagnostic {
                    writeln!(f, "  {} failed: {}", strategy, reason)?;
                }
            }
            if let Some(failure) = &self.outcome.failure {
                writeln!(f, "  value: {}", failure.dump)?;
            }
            return Ok(());
        };

        writeln!(
            f,
            "Strategy: {} ({} records)",
            strategy,
            self.outcome.records.len()
        )?;
        if let Some(count) = self.outcome.polygon_count {
            writeln!(f, "Polygons: {}", count)?;
        }
        for diagnostic in &self.outcome.diagnostics {
            match diagnostic {
                Diagnostic::LengthMismatch { texts, scores } => writeln!(
                    f,
                    "  note: {} texts but {} scores, kept {}",
                    texts,
                    scores,
                    texts.min(scores)
                )?,
                Diagnostic::EntrySkipped { index, reason } => {
                    writeln!(f, "  note: skipped entry {}: {}", index, reason)?
                }
                Diagnostic::StrategyFailed { .. } => {}
            }
        }

        for (i, record) in self.outcome.records.iter().enumerate() {
            writeln!(
                f,
                "Text {}: '{}' (confidence: {:.3})",
                i + 1,
                record.text,
                record.confidence
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Extracted {} valid texts", self.transcript.accepted.len())?;
        writeln!(f, "Total characters: {}", self.transcript.char_count())?;
        writeln!(
            f,
            "Sample: {}",
            truncate_chars(&self.transcript.combined, SAMPLE_LIMIT)
        )?;

        match (self.substantial, self.artifact) {
            (true, Some(path)) => writeln!(f, "Transcript saved to {}", path.display()),
            (true, None) => writeln!(f, "Text extraction working"),
            (false, _) => writeln!(f, "Limited text extracted"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShapeReport<'a> {
    pub source: String,
    pub summary: &'a ShapeSummary,
}

impl fmt::Display for ShapeReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        writeln!(f, "Source: {}", self.source)?;
        writeln!(f, "Type: {}", summary.kind)?;
        if let Some(length) = summary.length {
            writeln!(f, "Length: {}", length)?;
        }
        if !summary.keys.is_empty() {
            writeln!(f, "Keys: {}", summary.keys.join(", "))?;
        }
        if !summary.attribute_keys.is_empty() {
            writeln!(f, "Attributes: {}", summary.attribute_keys.join(", "))?;
        }
        for entry in &summary.preview {
            match entry.length {
                Some(length) => writeln!(
                    f,
                    "  {} ({}, {}): {}",
                    entry.label, entry.kind, length, entry.value
                )?,
                None => writeln!(f, "  {} ({}): {}", entry.label, entry.kind, entry.value)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SearchReport<'a> {
    pub block_count: usize,
    pub keywords: &'a [String],
    pub matches: &'a MatchReport,
    pub window: &'a AnchorWindow,
}

impl fmt::Display for SearchReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Searched {} blocks for {} keywords",
            self.block_count,
            self.keywords.len()
        )?;
        for hit in &self.matches.matches {
            writeln!(
                f,
                "Block {:2}: '{}' --> Contains: '{}'",
                hit.block_index,
                truncate_chars(&hit.block_text, BLOCK_LIMIT),
                hit.keyword
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Total matches found: {}", self.matches.total)?;
        writeln!(f)?;

        match self.window {
            AnchorWindow::Found {
                anchor_index,
                lines,
                ..
            } => {
                writeln!(f, "Anchor at block {}", anchor_index)?;
                for line in lines {
                    let marker = match line.role {
                        LineRole::Anchor => " -->      ",
                        LineRole::FollowsAnchor => "      *** ",
                        LineRole::Context => "          ",
                    };
                    writeln!(f, "{}Block {:2}: '{}'", marker, line.index, line.text)?;
                }
                Ok(())
            }
            AnchorWindow::NotFound { anchor } => writeln!(f, "Anchor '{}' not found", anchor),
        }
    }
}
