//! Multinomial logistic regression

use serde::{Deserialize, Serialize};

use super::{softmax, ModelError, ModelResult};

/// Linear scores per class passed through a softmax
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// One row of weights per class, one column per attribute
    pub weights: Vec<Vec<f64>>,
    /// One intercept per class
    pub bias: Vec<f64>,
}

impl LogisticRegression {
    pub fn new(weights: Vec<Vec<f64>>, bias: Vec<f64>) -> Self {
        Self { weights, bias }
    }

    pub(crate) fn validate(&self, num_attributes: usize, num_classes: usize) -> ModelResult<()> {
        if self.weights.len() != num_classes || self.bias.len() != num_classes {
            return Err(ModelError::invalid(format!(
                "logistic model has {} weight rows and {} intercepts for {} classes",
                self.weights.len(),
                self.bias.len(),
                num_classes
            )));
        }
        if let Some((class, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != num_attributes)
        {
            return Err(ModelError::invalid(format!(
                "logistic weights for class {} have {} columns, expected {}",
                class,
                row.len(),
                num_attributes
            )));
        }
        let finite = self.bias.iter().chain(self.weights.iter().flatten()).all(|w| w.is_finite());
        if !finite {
            return Err(ModelError::invalid("logistic model contains non-finite parameters"));
        }
        Ok(())
    }

    pub(crate) fn distribution(&self, x: &[f64]) -> Vec<f64> {
        let scores: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect();
        softmax(&scores)
    }
}
