//! OCR engine implementations
//!
//! This module contains implementations of the OcrEngine trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

use crate::engine::OcrEngine;
use crate::error::ProbeError;
use std::sync::Arc;

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with all available engines initialized
    pub fn new() -> Result<Self, ProbeError> {
        #[allow(unused_mut)]
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();
        #[allow(unused_mut)]
        let mut default_engine = String::new();

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs engine...");
            let ocrs_engine = ocrs::OcrsEngine::new()?;
            if default_engine.is_empty() {
                default_engine = ocrs_engine.name().to_string();
            }
            engines.push(Arc::new(ocrs_engine));
        }

        if engines.is_empty() {
            return Err(ProbeError::EngineUnavailable(
                "No OCR engines available. Build with --features engine-ocrs".to_string(),
            ));
        }

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default(&self) -> Option<Arc<dyn OcrEngine>> {
        self.get(&self.default_engine)
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Resolve a requested engine name, falling back to the default
    pub fn select(&self, name: Option<&str>) -> Result<Arc<dyn OcrEngine>, ProbeError> {
        let engine = match name {
            Some(name) => self.get(name),
            None => self.default(),
        };
        engine.ok_or_else(|| {
            ProbeError::EngineUnavailable(format!(
                "{} (available: {})",
                name.unwrap_or("default"),
                self.list().join(", ")
            ))
        })
    }
}
