/// Tree Ensemble Runtime
///
/// Random forest exported to JSON. Each tree is a flat node array; split
/// nodes send `x[feature] <= threshold` left, leaves hold per-class counts or
/// probabilities. The posterior is the mean of the normalized leaf
/// distributions, matching sklearn's `predict_proba`.
use super::{artifacts::load_json, InferenceModel};
use crate::error::{PredictionError, Result};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f32>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    pub fn load(path: &Path) -> Result<Self> {
        let ensemble: Self = load_json(path)?;
        ensemble.validate()?;
        Ok(ensemble)
    }

    /// Reject forests whose trees reference missing nodes, features or classes
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(PredictionError::ArtifactCorrupt(
                "tree ensemble has no trees".to_string(),
            ));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(PredictionError::ArtifactCorrupt(format!(
                    "tree {} has no nodes",
                    t
                )));
            }
            for node in &tree.nodes {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.n_features
                            || *left >= tree.nodes.len()
                            || *right >= tree.nodes.len()
                        {
                            return Err(PredictionError::ArtifactCorrupt(format!(
                                "tree {} has an out-of-range split",
                                t
                            )));
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != self.n_classes {
                            return Err(PredictionError::IncompatibleShape {
                                expected: self.n_classes,
                                actual: value.len(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Mean class distribution over all trees
    pub fn predict_proba(&self, row: &[f32]) -> Result<Vec<f32>> {
        if row.len() != self.n_features {
            return Err(PredictionError::IncompatibleShape {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        let mut acc = vec![0.0f32; self.n_classes];
        for tree in &self.trees {
            let leaf = Self::walk(tree, row)?;
            let total: f32 = leaf.iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (a, v) in acc.iter_mut().zip(leaf.iter()) {
                *a += v / total;
            }
        }

        let n_trees = self.trees.len() as f32;
        Ok(acc.into_iter().map(|a| a / n_trees).collect())
    }

    fn walk<'a>(tree: &'a DecisionTree, row: &[f32]) -> Result<&'a [f32]> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..=tree.nodes.len() {
            match &tree.nodes[idx] {
                TreeNode::Leaf { value } => return Ok(value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }

        Err(PredictionError::InferenceError(
            "tree traversal did not reach a leaf".to_string(),
        ))
    }
}

impl InferenceModel for TreeEnsemble {
    fn name(&self) -> &'static str {
        "tree_ensemble"
    }

    fn input_dim(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn infer(&self, input: ArrayD<f32>) -> Result<Vec<f32>> {
        let row: Vec<f32> = input.iter().copied().collect();
        self.predict_proba(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f32, left: Vec<f32>, right: Vec<f32>) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    fn forest() -> TreeEnsemble {
        TreeEnsemble {
            n_features: 2,
            n_classes: 2,
            trees: vec![
                stump(0, 100.0, vec![8.0, 2.0], vec![1.0, 9.0]),
                stump(1, 50.0, vec![1.0, 0.0], vec![0.0, 1.0]),
            ],
        }
    }

    #[test]
    fn test_predict_proba_averages_trees() {
        let proba = forest().predict_proba(&[200.0, 10.0]).unwrap();
        // tree 1 -> [0.1, 0.9], tree 2 -> [1.0, 0.0]
        assert!((proba[0] - 0.55).abs() < 1e-6);
        assert!((proba[1] - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_goes_left() {
        let proba = forest().predict_proba(&[100.0, 50.0]).unwrap();
        assert!((proba[0] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_row_width() {
        let err = forest().predict_proba(&[1.0; 7]).unwrap_err();
        assert!(matches!(err, PredictionError::IncompatibleShape { .. }));
    }

    #[test]
    fn test_validate_rejects_dangling_child() {
        let mut bad = forest();
        bad.trees[0].nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 1.0,
            left: 7,
            right: 2,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let looping = TreeEnsemble {
            n_features: 1,
            n_classes: 1,
            trees: vec![DecisionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 0,
                        right: 0,
                    },
                    TreeNode::Leaf { value: vec![1.0] },
                ],
            }],
        };
        assert!(looping.predict_proba(&[0.0]).is_err());
    }

    #[test]
    fn test_json_roundtrip_shape() {
        let json = r#"{
            "n_features": 1,
            "n_classes": 2,
            "trees": [{"nodes": [
                {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
                {"value": [3.0, 1.0]},
                {"value": [0.0, 4.0]}
            ]}]
        }"#;
        let ensemble: TreeEnsemble = serde_json::from_str(json).unwrap();
        ensemble.validate().unwrap();
        assert_eq!(ensemble.predict_proba(&[0.0]).unwrap(), vec![0.75, 0.25]);
    }
}
