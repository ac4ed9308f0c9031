//! Binary decision tree with class-count leaves

use serde::{Deserialize, Serialize};

use super::{ModelError, ModelResult};

/// One node of a [`DecisionTree`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Go `left` when `attribute <= threshold`, otherwise `right`
    Split {
        attribute: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Training class counts that reached this leaf
    Leaf { counts: Vec<f64> },
}

/// Tree stored as a flat node list rooted at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    pub(crate) fn validate(&self, num_attributes: usize, num_classes: usize) -> ModelResult<()> {
        if self.nodes.is_empty() {
            return Err(ModelError::invalid("decision tree has no nodes"));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    attribute,
                    threshold,
                    left,
                    right,
                } => {
                    if *attribute >= num_attributes {
                        return Err(ModelError::invalid(format!(
                            "node {} splits on attribute {} of {}",
                            idx, attribute, num_attributes
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::invalid(format!("node {} has a NaN threshold", idx)));
                    }
                    // Children must come after their parent, so every walk terminates.
                    let in_range = |child: usize| child > idx && child < self.nodes.len();
                    if !in_range(*left) || !in_range(*right) {
                        return Err(ModelError::invalid(format!(
                            "node {} references children {} and {} out of order",
                            idx, left, right
                        )));
                    }
                }
                TreeNode::Leaf { counts } => {
                    if counts.len() != num_classes {
                        return Err(ModelError::invalid(format!(
                            "leaf {} has {} counts for {} classes",
                            idx,
                            counts.len(),
                            num_classes
                        )));
                    }
                    if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
                        return Err(ModelError::invalid(format!(
                            "leaf {} has negative or non-finite counts",
                            idx
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn distribution(&self, x: &[f64]) -> ModelResult<Vec<f64>> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    attribute,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*attribute).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { counts }) => {
                    let total: f64 = counts.iter().sum();
                    if total <= 0.0 {
                        let uniform = 1.0 / counts.len() as f64;
                        return Ok(vec![uniform; counts.len()]);
                    }
                    return Ok(counts.iter().map(|c| c / total).collect());
                }
                None => {
                    return Err(ModelError::classification(format!(
                        "tree walk reached missing node {}",
                        idx
                    )))
                }
            }
        }
    }
}
