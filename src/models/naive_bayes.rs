//! Gaussian naive Bayes

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{softmax, ModelError, ModelResult};

/// Per-class normal distributions over independent attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Prior probability of each class
    pub priors: Vec<f64>,
    /// Attribute means, one row per class
    pub means: Vec<Vec<f64>>,
    /// Attribute variances, one row per class
    pub variances: Vec<Vec<f64>>,
}

impl GaussianNaiveBayes {
    pub fn new(priors: Vec<f64>, means: Vec<Vec<f64>>, variances: Vec<Vec<f64>>) -> Self {
        Self {
            priors,
            means,
            variances,
        }
    }

    pub(crate) fn validate(&self, num_attributes: usize, num_classes: usize) -> ModelResult<()> {
        if self.priors.len() != num_classes
            || self.means.len() != num_classes
            || self.variances.len() != num_classes
        {
            return Err(ModelError::invalid(format!(
                "naive bayes model needs {} priors, mean rows and variance rows",
                num_classes
            )));
        }
        let rows_ok = self
            .means
            .iter()
            .chain(&self.variances)
            .all(|row| row.len() == num_attributes);
        if !rows_ok {
            return Err(ModelError::invalid(format!(
                "naive bayes rows must have {} columns",
                num_attributes
            )));
        }
        if self.priors.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(ModelError::invalid("naive bayes priors must be positive"));
        }
        if self.variances.iter().flatten().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ModelError::invalid("naive bayes variances must be positive"));
        }
        if self.means.iter().flatten().any(|m| !m.is_finite()) {
            return Err(ModelError::invalid("naive bayes means must be finite"));
        }
        Ok(())
    }

    pub(crate) fn distribution(&self, x: &[f64]) -> Vec<f64> {
        // Joint log-likelihoods normalise to posteriors through a softmax.
        let log_joint: Vec<f64> = self
            .priors
            .iter()
            .zip(self.means.iter().zip(&self.variances))
            .map(|(prior, (means, variances))| {
                let log_likelihood: f64 = x
                    .iter()
                    .zip(means.iter().zip(variances))
                    .map(|(v, (mean, var))| {
                        -0.5 * (2.0 * PI * var).ln() - (v - mean).powi(2) / (2.0 * var)
                    })
                    .sum();
                prior.ln() + log_likelihood
            })
            .collect();
        softmax(&log_joint)
    }
}
