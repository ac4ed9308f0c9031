//! Classifier capability and model registry
//!
//! The session layer only sees two seams:
//! - [`ModelRegistry`]: turns a filesystem path into a ready classifier
//! - [`Classifier`]: fixed-length feature vector in, class index, distribution and label out
//!
//! [`FileModelRegistry`] is the registry shipped with the service. It reads
//! [`ModelDocument`] files holding one of the built-in model families.

pub mod error;
pub mod logistic;
pub mod naive_bayes;
pub mod registry;
pub mod tree;

pub use error::{ModelError, ModelResult};
pub use logistic::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;
pub use registry::{FileModelRegistry, LoadedModel, ModelDocument, ModelFormat, ModelKind};
pub use tree::{DecisionTree, TreeNode};

use std::path::Path;
use std::sync::Arc;

/// Ordered numeric input for one classification request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Zero-initialized vector of the given length
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_values(values)
    }
}

/// Outcome of classifying one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class index
    pub index: usize,
    /// Probability per class, in the classifier's class order
    pub dist: Vec<f64>,
    /// Label of the predicted class
    pub label: String,
}

/// Prediction engine bound to one loaded model
///
/// Implementations are immutable after load and must be safe to call from
/// the blocking pool.
pub trait Classifier: Send + Sync {
    /// Number of attributes the model expects per feature vector
    fn num_attributes(&self) -> usize;

    /// Class labels in class-index order
    fn labels(&self) -> &[String];

    /// Probability distribution over classes
    fn distribution(&self, features: &FeatureVector) -> ModelResult<Vec<f64>>;

    /// Predicted class index
    fn classify(&self, features: &FeatureVector) -> ModelResult<usize> {
        let dist = self.distribution(features)?;
        argmax(&dist).ok_or_else(|| ModelError::classification("model produced an empty distribution"))
    }

    /// Label for a class index
    fn label(&self, index: usize) -> Option<&str> {
        self.labels().get(index).map(String::as_str)
    }

    /// Run classify, distribution and label lookup for one vector
    fn predict(&self, features: &FeatureVector) -> ModelResult<Prediction> {
        if features.len() != self.num_attributes() {
            return Err(ModelError::DimensionMismatch {
                expected: self.num_attributes(),
                actual: features.len(),
            });
        }
        let index = self.classify(features)?;
        let dist = self.distribution(features)?;
        let label = self
            .label(index)
            .ok_or(ModelError::UnknownLabel { index })?
            .to_string();
        Ok(Prediction { index, dist, label })
    }
}

/// Source of classifiers, keyed by filesystem path
pub trait ModelRegistry: Send + Sync + 'static {
    /// Load the model stored at `path`
    ///
    /// Called from the blocking pool; may perform filesystem I/O.
    fn load(&self, path: &Path) -> ModelResult<Arc<dyn Classifier>>;
}

/// Index of the largest value, first one on ties. NaN never wins.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, current)| value > current) {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Numerically stable softmax
pub(crate) fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
