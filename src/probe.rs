//! Structural description of opaque OCR results
//!
//! Answers "what did the engine actually hand back?" without assuming any
//! particular shape: the kind of value, its size, its keys and a short
//! preview of the first entries.

use serde::Serialize;
use serde_json::Value;

/// Characters kept per preview entry
const PREVIEW_LIMIT: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeSummary {
    pub kind: &'static str,
    /// Elements, keys or characters, depending on the kind
    pub length: Option<usize>,
    pub keys: Vec<String>,
    /// Keys of the attribute container, when there is one
    pub attribute_keys: Vec<String>,
    pub preview: Vec<PreviewEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewEntry {
    pub label: String,
    pub kind: &'static str,
    pub length: Option<usize>,
    pub value: String,
}

/// Describe `value`, previewing at most `preview` entries
pub fn describe(value: &Value, attribute_container: &str, preview: usize) -> ShapeSummary {
    let keys = value
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    let attribute_keys = value
        .get(attribute_container)
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();

    let preview = match value {
        Value::Array(items) => items
            .iter()
            .take(preview)
            .enumerate()
            .map(|(i, item)| preview_entry(format!("[{}]", i), item))
            .collect(),
        Value::Object(map) => map
            .iter()
            .take(preview)
            .map(|(key, item)| preview_entry(key.clone(), item))
            .collect(),
        _ => Vec::new(),
    };

    ShapeSummary {
        kind: kind_of(value),
        length: length_of(value),
        keys,
        attribute_keys,
        preview,
    }
}

fn preview_entry(label: String, item: &Value) -> PreviewEntry {
    PreviewEntry {
        label,
        kind: kind_of(item),
        length: length_of(item),
        value: compact(item, PREVIEW_LIMIT),
    }
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

/// Single-line JSON rendering cut to `limit` characters
pub fn compact(value: &Value, limit: usize) -> String {
    truncate_chars(&value.to_string(), limit)
}

/// Cut `text` to `limit` characters, marking the cut with `...`
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
