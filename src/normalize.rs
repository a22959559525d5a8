//! Detection result normalization
//!
//! OCR engines return their detections in shapes that change between
//! versions: a mapping of two parallel arrays, the same arrays exposed as
//! attributes of a result object, or a list of `[boundary, [text, score]]`
//! entries. [`normalize`] tries a fixed list of decoders against the opaque
//! value and stops at the first one that succeeds.

use crate::error::ProbeError;
use crate::probe::{compact, kind_of};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Characters of the raw value kept in an unrecognized-structure report
const DUMP_LIMIT: usize = 200;

/// One recognized piece of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub text: String,
    pub confidence: f32,
}

/// Field names to look for, each list in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldHints {
    pub text_fields: Vec<String>,
    pub score_fields: Vec<String>,
    /// Only counted, never decoded
    pub polygon_field: Option<String>,
    /// Object under which result attributes are serialized
    pub attribute_container: String,
}

impl Default for FieldHints {
    fn default() -> Self {
        Self {
            text_fields: vec!["rec_texts".to_string(), "rec_text".to_string()],
            score_fields: vec!["rec_scores".to_string(), "rec_score".to_string()],
            polygon_field: Some("dt_polys".to_string()),
            attribute_container: "res".to_string(),
        }
    }
}

/// Decoding strategies in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Text and score arrays as top-level keys
    Mapping,
    /// Text and score arrays as attributes of a result object
    Attributes,
    /// A list of `[boundary, [text, score]]` detection entries
    PairwiseIteration,
}

impl Strategy {
    pub const ORDER: [Strategy; 3] = [
        Strategy::Mapping,
        Strategy::Attributes,
        Strategy::PairwiseIteration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mapping => "mapping",
            Self::Attributes => "attributes",
            Self::PairwiseIteration => "pairwise_iteration",
        }
    }

    fn decode(self, value: &Value, hints: &FieldHints) -> Result<Decoded, DecodeError> {
        match self {
            Self::Mapping => decode_mapping(value, hints),
            Self::Attributes => decode_attributes(value, hints),
            Self::PairwiseIteration => decode_detections(value),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single strategy did not apply
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("no field named any of [{candidates}]")]
    MissingField { candidates: String },

    #[error("field `{field}` is not an array")]
    NotAnArray { field: String },

    #[error("element {index} of `{field}`: {reason}")]
    BadElement {
        field: String,
        index: usize,
        reason: String,
    },

    #[error("none of the {0} entries unpacked as a detection")]
    NoDetections(usize),
}

/// Recoverable events noticed while normalizing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    StrategyFailed { strategy: Strategy, reason: String },
    /// Text and score arrays differ in length; records were truncated
    LengthMismatch { texts: usize, scores: usize },
    EntrySkipped { index: usize, reason: String },
}

/// Every strategy failed. Carries what was inspected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureUnrecognized {
    pub kind: &'static str,
    pub keys: Vec<String>,
    pub attribute_keys: Vec<String>,
    pub dump: String,
}

impl StructureUnrecognized {
    fn inspect(value: &Value, hints: &FieldHints) -> Self {
        let keys = value
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        let attribute_keys = value
            .get(&hints.attribute_container)
            .and_then(Value::as_object)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();

        Self {
            kind: kind_of(value),
            keys,
            attribute_keys,
            dump: compact(value, DUMP_LIMIT),
        }
    }
}

impl fmt::Display for StructureUnrecognized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized {} structure", self.kind)?;
        if !self.keys.is_empty() {
            write!(f, " (keys: {})", self.keys.join(", "))?;
        }
        if !self.attribute_keys.is_empty() {
            write!(f, " (attributes: {})", self.attribute_keys.join(", "))?;
        }
        Ok(())
    }
}

/// Result of one normalization pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeOutcome {
    pub records: Vec<DetectionRecord>,
    pub strategy: Option<Strategy>,
    pub polygon_count: Option<usize>,
    pub diagnostics: Vec<Diagnostic>,
    pub failure: Option<StructureUnrecognized>,
}

impl NormalizeOutcome {
    pub fn is_success(&self) -> bool {
        self.strategy.is_some()
    }
}

struct Decoded {
    records: Vec<DetectionRecord>,
    polygon_count: Option<usize>,
    diagnostics: Vec<Diagnostic>,
}

/// Normalize an opaque detection result.
///
/// Never fails: when no strategy applies the outcome holds no records and a
/// [`StructureUnrecognized`] report.
pub fn normalize(value: &Value, hints: &FieldHints) -> NormalizeOutcome {
    let mut diagnostics = Vec::new();

    for strategy in Strategy::ORDER {
        match strategy.decode(value, hints) {
            Ok(decoded) => {
                tracing::debug!(
                    "Decoded {} records using {} strategy",
                    decoded.records.len(),
                    strategy
                );
                diagnostics.extend(decoded.diagnostics);
                return NormalizeOutcome {
                    records: decoded.records,
                    strategy: Some(strategy),
                    polygon_count: decoded.polygon_count,
                    diagnostics,
                    failure: None,
                };
            }
            Err(e) => {
                tracing::debug!("{} strategy did not apply: {}", strategy, e);
                diagnostics.push(Diagnostic::StrategyFailed {
                    strategy,
                    reason: e.to_string(),
                });
            }
        }
    }

    let failure = StructureUnrecognized::inspect(value, hints);
    tracing::warn!("No strategy recovered detections: {}", failure);

    NormalizeOutcome {
        records: Vec::new(),
        strategy: None,
        polygon_count: None,
        diagnostics,
        failure: Some(failure),
    }
}

/// Pick one page out of a raw multi-page OCR result
pub fn select_page(value: Value, index: usize) -> Result<Value, ProbeError> {
    match value {
        Value::Array(mut pages) => {
            let available = pages.len();
            if index >= available {
                return Err(ProbeError::PageOutOfRange { index, available });
            }
            Ok(pages.swap_remove(index))
        }
        other => Err(ProbeError::InvalidInput(format!(
            "page selection needs a list of pages, found {}",
            kind_of(&other)
        ))),
    }
}

fn decode_mapping(value: &Value, hints: &FieldHints) -> Result<Decoded, DecodeError> {
    let fields = value.as_object().ok_or(DecodeError::WrongKind {
        expected: "object",
        found: kind_of(value),
    })?;
    decode_fields(fields, hints)
}

fn decode_attributes(value: &Value, hints: &FieldHints) -> Result<Decoded, DecodeError> {
    let object = value.as_object().ok_or(DecodeError::WrongKind {
        expected: "object",
        found: kind_of(value),
    })?;
    let container = object
        .get(&hints.attribute_container)
        .ok_or_else(|| DecodeError::MissingField {
            candidates: hints.attribute_container.clone(),
        })?;
    let attributes = container.as_object().ok_or(DecodeError::WrongKind {
        expected: "attribute object",
        found: kind_of(container),
    })?;
    decode_fields(attributes, hints)
}

fn decode_fields(fields: &Map<String, Value>, hints: &FieldHints) -> Result<Decoded, DecodeError> {
    let (text_field, texts) = lookup_array(fields, &hints.text_fields)?;
    let (score_field, scores) = lookup_array(fields, &hints.score_fields)?;

    let mut diagnostics = Vec::new();
    if texts.len() != scores.len() {
        tracing::debug!(
            "`{}` has {} entries but `{}` has {}, truncating",
            text_field,
            texts.len(),
            score_field,
            scores.len()
        );
        diagnostics.push(Diagnostic::LengthMismatch {
            texts: texts.len(),
            scores: scores.len(),
        });
    }

    let mut records = Vec::with_capacity(texts.len().min(scores.len()));
    for (index, (text, score)) in texts.iter().zip(scores).enumerate() {
        let confidence = confidence_of(score).map_err(|reason| DecodeError::BadElement {
            field: score_field.to_string(),
            index,
            reason,
        })?;
        match text_of(text) {
            Some(text) => records.push(DetectionRecord { text, confidence }),
            None => {
                let reason = format!("`{}` holds {}, not text", text_field, kind_of(text));
                tracing::debug!("Skipping element {}: {}", index, reason);
                diagnostics.push(Diagnostic::EntrySkipped { index, reason });
            }
        }
    }

    let polygon_count = hints
        .polygon_field
        .as_deref()
        .and_then(|name| fields.get(name))
        .and_then(Value::as_array)
        .map(Vec::len);

    Ok(Decoded {
        records,
        polygon_count,
        diagnostics,
    })
}

fn lookup_array<'a>(
    fields: &'a Map<String, Value>,
    names: &'a [String],
) -> Result<(&'a str, &'a [Value]), DecodeError> {
    if let Some((name, items)) = names
        .iter()
        .find_map(|name| fields.get(name)?.as_array().map(|items| (name, items)))
    {
        return Ok((name.as_str(), items.as_slice()));
    }

    match names.iter().find(|name| fields.contains_key(name.as_str())) {
        Some(name) => Err(DecodeError::NotAnArray {
            field: name.clone(),
        }),
        None => Err(DecodeError::MissingField {
            candidates: names.join(", "),
        }),
    }
}

fn decode_detections(value: &Value) -> Result<Decoded, DecodeError> {
    let entries = value.as_array().ok_or(DecodeError::WrongKind {
        expected: "array",
        found: kind_of(value),
    })?;

    let mut records = Vec::with_capacity(entries.len());
    let mut diagnostics = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match unpack_entry(entry) {
            Ok(record) => records.push(record),
            Err(reason) => {
                tracing::debug!("Skipping detection entry {}: {}", index, reason);
                diagnostics.push(Diagnostic::EntrySkipped { index, reason });
            }
        }
    }

    if records.is_empty() && !entries.is_empty() {
        return Err(DecodeError::NoDetections(entries.len()));
    }

    Ok(Decoded {
        records,
        polygon_count: None,
        diagnostics,
    })
}

/// `[boundary, [text, score]]`, falling back to `[boundary, [[text, score]]]`
/// and then to `[boundary, [text, score, ..]]`
fn unpack_entry(entry: &Value) -> Result<DetectionRecord, String> {
    let text_data = match entry.as_array().map(Vec::as_slice) {
        Some([_boundary, text_data]) => text_data,
        Some(items) => {
            return Err(format!(
                "expected [boundary, text] pair, found {} elements",
                items.len()
            ))
        }
        None => return Err(format!("expected array entry, found {}", kind_of(entry))),
    };

    unpack_flat(text_data)
        .or_else(|flat| {
            unpack_nested(text_data).map_err(|nested| format!("{}; {}", flat, nested))
        })
        .or_else(|earlier| unpack_leading(text_data).map_err(|_| earlier))
}

fn unpack_flat(text_data: &Value) -> Result<DetectionRecord, String> {
    match text_data.as_array().map(Vec::as_slice) {
        Some([text, score]) => {
            let text = text_of(text)
                .ok_or_else(|| format!("expected text, found {}", kind_of(text)))?;
            let confidence = confidence_of(score)?;
            Ok(DetectionRecord { text, confidence })
        }
        _ => Err("text data is not a [text, confidence] pair".to_string()),
    }
}

fn unpack_nested(text_data: &Value) -> Result<DetectionRecord, String> {
    match text_data.as_array().map(Vec::as_slice) {
        Some([inner]) => unpack_flat(inner).map_err(|e| format!("wrapped {}", e)),
        _ => Err("text data is not a wrapped [text, confidence] pair".to_string()),
    }
}

/// `[text, score, ..]`: trailing elements are ignored
fn unpack_leading(text_data: &Value) -> Result<DetectionRecord, String> {
    match text_data.as_array().map(Vec::as_slice) {
        Some([text, score, _, ..]) => {
            let text = text_of(text)
                .ok_or_else(|| format!("expected text, found {}", kind_of(text)))?;
            let confidence = confidence_of(score)?;
            Ok(DetectionRecord { text, confidence })
        }
        _ => Err("text data does not start with [text, confidence]".to_string()),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn confidence_of(value: &Value) -> Result<f32, String> {
    let score = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("score {} is not representable", n))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("score {:?} is not numeric", s))?,
        other => return Err(format!("expected score, found {}", kind_of(other))),
    };

    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(format!("score {} outside [0, 1]", score));
    }
    Ok(score as f32)
}
