//! Acceptance filtering and transcript assembly
//!
//! Normalized records are filtered by a caller policy and joined into one
//! transcript, which may be persisted as a plain UTF-8 text file.

use crate::error::ProbeError;
use crate::normalize::DetectionRecord;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Which records count as usable text
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AcceptancePolicy {
    /// Minimum characters after trimming
    pub min_text_len: usize,
    pub min_confidence: f32,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            min_text_len: 2,
            min_confidence: 0.3,
        }
    }
}

impl AcceptancePolicy {
    pub fn accepts(&self, record: &DetectionRecord) -> bool {
        record.text.trim().chars().count() >= self.min_text_len
            && record.confidence >= self.min_confidence
    }

    /// Accepted records in original order, text trimmed
    pub fn filter(&self, records: &[DetectionRecord]) -> Vec<DetectionRecord> {
        records
            .iter()
            .filter(|record| self.accepts(record))
            .map(|record| DetectionRecord {
                text: record.text.trim().to_string(),
                confidence: record.confidence,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub accepted: Vec<DetectionRecord>,
    pub combined: String,
}

impl Transcript {
    pub fn build(records: &[DetectionRecord], policy: &AcceptancePolicy) -> Self {
        let accepted = policy.filter(records);
        let combined = accepted
            .iter()
            .map(|record| record.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self { accepted, combined }
    }

    pub fn char_count(&self) -> usize {
        self.combined.chars().count()
    }

    /// More than `min_chars` characters of combined text
    pub fn is_substantial(&self, min_chars: usize) -> bool {
        self.char_count() > min_chars
    }
}

/// Write `contents` to `path` through a temporary file in the same directory
pub fn write_artifact(path: &Path, contents: &str) -> Result<(), ProbeError> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp_file = tempfile::Builder::new()
        .prefix(".transcript")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ProbeError::io(dir, e))?;

    temp_file
        .write_all(contents.as_bytes())
        .map_err(|e| ProbeError::io(temp_file.path(), e))?;

    temp_file
        .persist(path)
        .map_err(|e| ProbeError::io(path, e.error))?;

    tracing::info!("Transcript saved to {}", path.display());
    Ok(())
}
