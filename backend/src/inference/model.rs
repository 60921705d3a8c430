use log::{error, info};
use ndarray::Array4;
use shared::LesionClass;
use std::sync::Arc;

use crate::config::ModelConfig;
use crate::inference::preprocess::{ImageTensor, input_shape};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model produced {actual} outputs, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("Model output has no comparable values")]
    InvalidOutput,
    #[error("Model error: {0}")]
    Model(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {0}")]
    NotFound(std::path::PathBuf),
    #[cfg_attr(feature = "torch", allow(dead_code))]
    #[error("No model backend compiled in (enable the `torch` feature)")]
    BackendUnavailable,
    #[cfg_attr(not(feature = "torch"), allow(dead_code))]
    #[error("Failed to load model: {0}")]
    Backend(String),
    #[error("Model has {actual} output classes but there are {expected} labels")]
    LabelCountMismatch { expected: usize, actual: usize },
    #[error("Warm-up inference failed: {0}")]
    WarmUp(#[from] InferenceError),
}

/// A loaded image classifier. Implementations must tolerate concurrent calls.
pub trait Classifier: Send + Sync {
    /// Returns one score per class for a (1, 224, 224, 3) input.
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class: LesionClass,
    pub confidence: f32,
}

/// Holds the classifier for the lifetime of the server, or nothing if loading failed.
#[derive(Clone)]
pub struct ModelHolder {
    classifier: Option<Arc<dyn Classifier>>,
}

impl ModelHolder {
    /// Never fails: a load error is logged and leaves the holder unavailable.
    pub fn load(config: &ModelConfig) -> Self {
        match Self::try_load(config) {
            Ok(holder) => {
                info!("Model loaded successfully from {}", config.path.display());
                holder
            }
            Err(e) => {
                error!("Error loading model from {}: {}", config.path.display(), e);
                Self::unavailable()
            }
        }
    }

    pub fn try_load(config: &ModelConfig) -> Result<Self, ModelLoadError> {
        if !config.path.exists() {
            return Err(ModelLoadError::NotFound(config.path.clone()));
        }
        let classifier = open_backend(config)?;
        Self::verified(classifier)
    }

    /// Runs one probe inference and rejects classifiers whose output width
    /// differs from the label set.
    pub fn verified(classifier: Arc<dyn Classifier>) -> Result<Self, ModelLoadError> {
        let probe: ImageTensor = Array4::zeros(input_shape());
        let actual = classifier.predict(&probe)?.len();
        if actual != LesionClass::COUNT {
            return Err(ModelLoadError::LabelCountMismatch {
                expected: LesionClass::COUNT,
                actual,
            });
        }
        Ok(Self::new(classifier))
    }

    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier: Some(classifier),
        }
    }

    pub fn unavailable() -> Self {
        Self { classifier: None }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn classifier(&self) -> Option<Arc<dyn Classifier>> {
        self.classifier.clone()
    }
}

#[cfg(feature = "torch")]
fn open_backend(config: &ModelConfig) -> Result<Arc<dyn Classifier>, ModelLoadError> {
    let classifier = crate::inference::torch::TorchClassifier::load(config)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "torch"))]
fn open_backend(_config: &ModelConfig) -> Result<Arc<dyn Classifier>, ModelLoadError> {
    Err(ModelLoadError::BackendUnavailable)
}

pub fn classify(
    classifier: &dyn Classifier,
    input: &ImageTensor,
) -> Result<Prediction, InferenceError> {
    let scores = classifier.predict(input)?;
    if scores.len() != LesionClass::COUNT {
        return Err(InferenceError::ShapeMismatch {
            expected: LesionClass::COUNT,
            actual: scores.len(),
        });
    }

    let (index, confidence) = argmax(&scores).ok_or(InferenceError::InvalidOutput)?;
    let class = LesionClass::from_index(index).ok_or(InferenceError::ShapeMismatch {
        expected: LesionClass::COUNT,
        actual: scores.len(),
    })?;

    Ok(Prediction { class, confidence })
}

/// Index and value of the largest score. The first maximum wins; NaN is skipped.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best, (index, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((index, score)),
        })
}
