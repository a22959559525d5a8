use thiserror::Error;

/// Failures of the collaborators around the normalizer and matcher.
///
/// Conditions the core recovers from (unrecognized structure, length
/// mismatch, skipped entries, missing anchor) are reported as values and
/// never show up here.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    #[error("Failed to initialize OCR engine: {0}")]
    EngineInitialization(String),

    #[error("Failed to process image: {0}")]
    EngineProcessing(String),

    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Page {index} out of range (result holds {available} pages)")]
    PageOutOfRange { index: usize, available: usize },
}

impl ProbeError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
