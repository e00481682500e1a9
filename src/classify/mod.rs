//! Image classification module
//!
//! This module consolidates:
//! - Ranked classification results and the announcement built from them (announcement.rs)
//! - ImageNet label parsing and score ranking (labels.rs)
//! - Model file download and caching (model.rs)
//! - SqueezeNet inference through ONNX Runtime (squeezenet.rs)

pub mod announcement;
pub mod labels;
pub mod model;
#[cfg(feature = "onnx")]
pub mod squeezenet;

use anyhow::Result;

use crate::config::{ClassifierBackend, ClassifierConfig};

/// One (label, confidence) pair of a classification result
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    /// Score in 0..=1
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// An image classifier over encoded photo bytes
///
/// `classify` blocks for the duration of inference; callers run it on a blocking worker.
/// Results are sorted by confidence, highest first.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, encoded: &[u8]) -> Result<Vec<Classification>>;
}

/// Create the classifier for the configured backend, loading its model
pub fn create_classifier(cfg: &ClassifierConfig) -> Result<Box<dyn Classifier>> {
    match cfg.backend {
        #[cfg(feature = "onnx")]
        ClassifierBackend::Squeezenet => Ok(Box::new(squeezenet::SqueezeNet::load(cfg)?)),
        #[cfg(not(feature = "onnx"))]
        ClassifierBackend::Squeezenet => {
            anyhow::bail!("ONNX classifier support not compiled in (enable the `onnx` feature)")
        }
    }
}
