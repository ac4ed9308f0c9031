//! File-backed model registry
//!
//! A model file holds a [`ModelDocument`]: attribute names, class labels and
//! the parameters of one model family. Files ending in `.json` are read as
//! JSON, anything else as bincode.

use bincode::Options;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    Classifier, DecisionTree, FeatureVector, GaussianNaiveBayes, LogisticRegression, ModelError,
    ModelRegistry, ModelResult,
};
use crate::constants::limits::MAX_MODEL_FILE_SIZE;

/// Parameters of one of the built-in model families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Logistic(LogisticRegression),
    NaiveBayes(GaussianNaiveBayes),
    Tree(DecisionTree),
}

impl ModelKind {
    fn name(&self) -> &'static str {
        match self {
            ModelKind::Logistic(_) => "logistic",
            ModelKind::NaiveBayes(_) => "naive_bayes",
            ModelKind::Tree(_) => "tree",
        }
    }
}

/// Serialized form of a trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    /// Attribute names, in feature-vector order
    pub attributes: Vec<String>,
    /// Class labels, in class-index order
    pub labels: Vec<String>,
    pub model: ModelKind,
}

/// On-disk encoding of a [`ModelDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    Bincode,
}

impl ModelFormat {
    /// Pick the encoding from the file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ModelFormat::Json,
            _ => ModelFormat::Bincode,
        }
    }
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_MODEL_FILE_SIZE)
}

impl ModelDocument {
    /// Decode a document from raw bytes
    pub fn from_bytes(bytes: &[u8], format: ModelFormat) -> Result<Self, String> {
        match format {
            ModelFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            ModelFormat::Bincode => bincode_options()
                .deserialize(bytes)
                .map_err(|e| e.to_string()),
        }
    }

    /// Encode the document
    pub fn to_bytes(&self, format: ModelFormat) -> Result<Vec<u8>, String> {
        match format {
            ModelFormat::Json => serde_json::to_vec_pretty(self).map_err(|e| e.to_string()),
            ModelFormat::Bincode => bincode_options().serialize(self).map_err(|e| e.to_string()),
        }
    }

    /// Read a document, choosing the encoding from the extension
    pub fn read_from(path: &Path) -> ModelResult<Self> {
        let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;
        if !metadata.is_file() {
            return Err(ModelError::format(path, "not a regular file"));
        }
        if metadata.len() > MAX_MODEL_FILE_SIZE {
            return Err(ModelError::format(
                path,
                format!("file is {} bytes, limit is {}", metadata.len(), MAX_MODEL_FILE_SIZE),
            ));
        }
        let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
        Self::from_bytes(&bytes, ModelFormat::from_path(path)).map_err(|reason| ModelError::format(path, reason))
    }

    /// Write the document, choosing the encoding from the extension
    pub fn write_to(&self, path: &Path) -> ModelResult<()> {
        let bytes = self
            .to_bytes(ModelFormat::from_path(path))
            .map_err(|reason| ModelError::format(path, reason))?;
        std::fs::write(path, bytes).map_err(|e| io_error(path, e))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ModelError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ModelError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        ModelError::Io {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

/// A validated model ready for classification
#[derive(Debug, Clone)]
pub struct LoadedModel {
    attributes: Vec<String>,
    labels: Vec<String>,
    kind: ModelKind,
}

impl LoadedModel {
    /// Validate a document and turn it into a classifier
    pub fn from_document(document: ModelDocument) -> ModelResult<Self> {
        let ModelDocument {
            attributes,
            labels,
            model,
        } = document;
        if attributes.is_empty() {
            return Err(ModelError::invalid("model declares no attributes"));
        }
        if labels.is_empty() {
            return Err(ModelError::invalid("model declares no class labels"));
        }
        let (num_attributes, num_classes) = (attributes.len(), labels.len());
        match &model {
            ModelKind::Logistic(m) => m.validate(num_attributes, num_classes)?,
            ModelKind::NaiveBayes(m) => m.validate(num_attributes, num_classes)?,
            ModelKind::Tree(m) => m.validate(num_attributes, num_classes)?,
        }
        Ok(Self {
            attributes,
            labels,
            kind: model,
        })
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }
}

impl Classifier for LoadedModel {
    fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn distribution(&self, features: &FeatureVector) -> ModelResult<Vec<f64>> {
        let x = features.as_slice();
        match &self.kind {
            ModelKind::Logistic(m) => Ok(m.distribution(x)),
            ModelKind::NaiveBayes(m) => Ok(m.distribution(x)),
            ModelKind::Tree(m) => m.distribution(x),
        }
    }
}

/// Registry reading [`ModelDocument`] files from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileModelRegistry {
    base_dir: Option<PathBuf>,
}

impl FileModelRegistry {
    /// Resolve relative paths against the process working directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ModelRegistry for FileModelRegistry {
    fn load(&self, path: &Path) -> ModelResult<Arc<dyn Classifier>> {
        let resolved = self.resolve(path);
        debug!("Loading model from: {:?}", resolved);
        let model = LoadedModel::from_document(ModelDocument::read_from(&resolved)?)?;
        info!(
            "Loaded {} model from {:?} ({} attributes, {} classes)",
            model.kind.name(),
            resolved,
            model.attributes.len(),
            model.labels.len()
        );
        Ok(Arc::new(model))
    }
}
