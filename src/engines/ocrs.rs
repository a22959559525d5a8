//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.
//!
//! Output is a list of `[polygon, [text, confidence]]` entries, one per
//! recognized line.

use crate::engine::{EngineOptions, OcrEngine};
use crate::error::ProbeError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;
use serde_json::{json, Value};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Load the models, downloading them if needed
    pub fn new() -> Result<Self, ProbeError> {
        let detection_model_path =
            ensure_model_downloaded(DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            ProbeError::EngineInitialization(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            ProbeError::EngineInitialization(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            ProbeError::EngineInitialization(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn detect(&self, image: &DynamicImage, options: &EngineOptions) -> Result<Value, ProbeError> {
        if options.use_angle_cls {
            tracing::warn!("ocrs has no angle classifier, ignoring use_angle_cls");
        }
        if !self.supported_languages().contains(&options.lang) {
            tracing::warn!("ocrs only recognizes Latin text, ignoring lang={}", options.lang);
        }
        tracing::debug!(
            "ocrs uses built-in detection thresholds (requested det_db_thresh={}, det_db_box_thresh={})",
            options.det_db_thresh,
            options.det_db_box_thresh
        );

        // Convert to RGB8 (HWC format, which is what ImageSource::from_bytes expects)
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            ProbeError::EngineProcessing(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| {
            ProbeError::EngineProcessing(format!("Failed to prepare input: {}", e))
        })?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| ProbeError::EngineProcessing(format!("Failed to detect words: {}", e)))?;

        // Group words into lines
        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| {
                ProbeError::EngineProcessing(format!("Failed to recognize text: {}", e))
            })?;

        let detections: Vec<Value> = line_rects
            .iter()
            .zip(line_texts.iter())
            .filter_map(|(words, line)| {
                let text = line
                    .as_ref()?
                    .words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                if text.is_empty() {
                    return None;
                }

                let corners: Vec<(f32, f32)> = words
                    .iter()
                    .flat_map(|rect| rect.corners())
                    .map(|point| (point.x, point.y))
                    .collect();
                let confidence = calculate_confidence(&text);

                Some(json!([line_polygon(&corners), [text, confidence]]))
            })
            .collect();

        tracing::debug!("ocrs recognized {} lines", detections.len());

        Ok(Value::Array(detections))
    }

    fn supported_languages(&self) -> Vec<String> {
        // ocrs currently only supports English/Latin alphabet
        vec!["en".to_string()]
    }
}

/// Axis-aligned quadrilateral around all word corners of a line
fn line_polygon(corners: &[(f32, f32)]) -> Value {
    if corners.is_empty() {
        return json!([]);
    }

    let (mut left, mut top) = (f32::MAX, f32::MAX);
    let (mut right, mut bottom) = (f32::MIN, f32::MIN);
    for &(x, y) in corners {
        left = left.min(x);
        top = top.min(y);
        right = right.max(x);
        bottom = bottom.max(y);
    }

    json!([[left, top], [right, top], [right, bottom], [left, bottom]])
}

// ============================================================================
// Confidence scoring heuristics
// ============================================================================

/// Calculate confidence score based on text quality heuristics.
///
/// ocrs reports no per-line scores, so each recognized line is scored by
/// looking for patterns that indicate garbled output.
fn calculate_confidence(text: &str) -> f32 {
    if text.is_empty() {
        return 0.0;
    }
    if text.chars().count() < 5 {
        return 0.5; // Too short to judge accurately
    }

    let char_score = analyze_char_frequency(text);
    let word_score = analyze_word_lengths(text);
    let whitespace_score = analyze_whitespace(text);
    let repetition_score = detect_repetition(text);

    let confidence =
        0.40 * char_score + 0.30 * word_score + 0.15 * whitespace_score + 0.15 * repetition_score;

    confidence.clamp(0.0, 1.0)
}

/// Penalizes text with many symbols or few letters.
fn analyze_char_frequency(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }

    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    let special = text
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !c.is_ascii_punctuation())
        .count();

    let special_ratio = special as f32 / total as f32;
    let special_penalty = 1.0 - (special_ratio * 10.0).min(1.0);

    let letter_ratio = letters as f32 / total as f32;
    let letter_score = (letter_ratio * 1.5).min(1.0);

    special_penalty * 0.6 + letter_score * 0.4
}

/// Garbled lines tend to split into single-character "words".
fn analyze_word_lengths(text: &str) -> f32 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.5;
    }

    let total_len: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg_len = total_len as f32 / words.len() as f32;

    let avg_score = match avg_len as usize {
        0..=1 => 0.3,
        2..=3 => 0.7,
        4..=8 => 1.0,
        9..=12 => 0.8,
        _ => 0.4,
    };

    let single_count = words.iter().filter(|w| w.chars().count() == 1).count();
    let single_ratio = single_count as f32 / words.len() as f32;
    let single_penalty = 1.0 - (single_ratio * 1.5).min(0.5);

    avg_score * single_penalty
}

/// Normal text has roughly 10-25% whitespace.
fn analyze_whitespace(text: &str) -> f32 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }

    let whitespace = text.chars().filter(|c| c.is_whitespace()).count();
    let ratio = (whitespace as f32 / total as f32) * 100.0;

    match ratio as usize {
        0..=5 => 0.5,
        6..=10 => 0.8,
        11..=25 => 1.0,
        26..=40 => 0.7,
        _ => 0.3,
    }
}

/// Runs like "aaaa" or "####" usually mean the recognizer got confused.
fn detect_repetition(text: &str) -> f32 {
    let mut max_repeat = 1;
    let mut current = 1;
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if Some(c) == prev && !c.is_whitespace() {
            current += 1;
            max_repeat = max_repeat.max(current);
        } else {
            current = 1;
        }
        prev = Some(c);
    }

    match max_repeat {
        1..=3 => 1.0,
        4..=5 => 0.8,
        6..=10 => 0.5,
        _ => 0.2,
    }
}

// ============================================================================
// Model cache
// ============================================================================

/// Ensure model is downloaded and return its path
fn ensure_model_downloaded(url: &str, filename: &str) -> Result<PathBuf, ProbeError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ocr-probe");

    std::fs::create_dir_all(&cache_dir).map_err(|e| ProbeError::io(&cache_dir, e))?;

    let model_path = cache_dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::info!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), ProbeError> {
    let response = ureq::get(url).call().map_err(|e| {
        ProbeError::EngineInitialization(format!("Failed to download model: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        ProbeError::EngineInitialization(format!("Failed to read response body: {}", e))
    })?;

    // Partial downloads must not be mistaken for a cached model
    let mut temp_file = tempfile::NamedTempFile::new_in(path.parent().unwrap_or(Path::new(".")))
        .map_err(|e| ProbeError::io(path, e))?;
    temp_file
        .write_all(&buffer)
        .map_err(|e| ProbeError::io(path, e))?;
    let file: File = temp_file
        .persist(path)
        .map_err(|e| ProbeError::io(path, e.error))?;
    file.sync_all().map_err(|e| ProbeError::io(path, e))?;

    Ok(())
}
