//! predictd: serves class predictions from pre-trained classifiers over a
//! line-oriented TCP protocol.
//!
//! Each connection names a model file, then streams attribute vectors and
//! receives one prediction line per request.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::Settings;
pub use error::{Error, Result};
pub use models::{Classifier, FeatureVector, FileModelRegistry, ModelRegistry, Prediction};
pub use service::PredictionServer;
