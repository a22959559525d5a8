use crate::error::ProbeError;
use image::DynamicImage;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Options handed to an engine for one detection call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineOptions {
    pub use_angle_cls: bool,
    pub lang: String,
    /// Pixel threshold of the text detection map
    pub det_db_thresh: f32,
    /// Minimum mean score of a detected box
    pub det_db_box_thresh: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            use_angle_cls: false,
            lang: "en".to_string(),
            det_db_thresh: 0.3,
            det_db_box_thresh: 0.6,
        }
    }
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Run detection and recognition on one image.
    ///
    /// The result is returned as-is, in whatever shape the engine produces;
    /// callers decode it with the normalizer.
    fn detect(&self, image: &DynamicImage, options: &EngineOptions) -> Result<Value, ProbeError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}

/// Decode an image file
pub fn load_image(path: &Path) -> Result<DynamicImage, ProbeError> {
    let img = image::open(path)
        .map_err(|e| ProbeError::ImageLoad(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(
        "Loaded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(img)
}
