//! Gradient-boosted tree ensemble
//!
//! Reads the JSON model layout written by XGBoost's `save_model("*.json")`:
//! every tree is a set of parallel node arrays, and categorical splits list
//! their category codes in the flat `categories` array, addressed through
//! `categories_nodes` / `categories_segments` / `categories_sizes`.
//!
//! # Evaluation
//!
//! - Numerical split: go left when `x < threshold`.
//! - Categorical split: categories in the node's set go right, others left.
//! - Missing value (NaN): follow the node's default direction.
//!
//! The raw output is the base score plus the sum of one leaf per tree.

use std::collections::HashMap;

use serde::Deserialize;

/// Objectives whose raw margin is already on the target scale.
const IDENTITY_OBJECTIVES: [&str; 5] = [
    "reg:squarederror",
    "reg:linear",
    "reg:absoluteerror",
    "reg:pseudohubererror",
    "reg:quantileerror",
];

const SPLIT_TYPE_CATEGORICAL: u8 = 1;

#[derive(Debug, Deserialize)]
pub(crate) struct ModelDocument {
    pub learner: LearnerDocument,
    /// Ordered labels per categorical column; a label's code is its index
    #[serde(default)]
    pub category_vocabularies: HashMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LearnerDocument {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_types: Vec<String>,
    pub learner_model_param: LearnerModelParam,
    pub gradient_booster: GradientBoosterDocument,
    #[serde(default)]
    pub objective: Option<ObjectiveDocument>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LearnerModelParam {
    /// Stored as text, e.g. `"1.2E1"` or `"[1.2E1]"`
    pub base_score: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ObjectiveDocument {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GradientBoosterDocument {
    pub name: String,
    pub model: GbTreeDocument,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GbTreeDocument {
    pub trees: Vec<TreeDocument>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeDocument {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
    #[serde(default)]
    categories: Vec<u32>,
    #[serde(default)]
    categories_nodes: Vec<usize>,
    #[serde(default)]
    categories_segments: Vec<usize>,
    #[serde(default)]
    categories_sizes: Vec<usize>,
}

/// Boolean written either as `true`/`false` or `1`/`0`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(n) => n != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f32,
    },
    Numerical {
        feature: usize,
        threshold: f32,
        default_left: bool,
        left: usize,
        right: usize,
    },
    Categorical {
        feature: usize,
        /// Sorted category codes routed right
        categories: Vec<u32>,
        default_left: bool,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_document(doc: &TreeDocument, num_features: usize) -> Result<Self, String> {
        let n = doc.left_children.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        let lengths = [
            ("right_children", doc.right_children.len()),
            ("split_indices", doc.split_indices.len()),
            ("split_conditions", doc.split_conditions.len()),
            ("default_left", doc.default_left.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(format!("{} has {} entries, expected {}", name, len, n));
            }
        }
        if !doc.split_type.is_empty() && doc.split_type.len() != n {
            return Err(format!(
                "split_type has {} entries, expected {}",
                doc.split_type.len(),
                n
            ));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            if doc.left_children[i] == -1 {
                let value = doc.split_conditions[i];
                if !value.is_finite() {
                    return Err(format!("leaf {} has non-finite value", i));
                }
                nodes.push(Node::Leaf { value });
                continue;
            }

            let left = child_index(doc.left_children[i], i, n)?;
            let right = child_index(doc.right_children[i], i, n)?;
            let feature = doc.split_indices[i] as usize;
            if feature >= num_features {
                return Err(format!(
                    "node {} splits on feature {}, model has {}",
                    i, feature, num_features
                ));
            }
            let default_left = doc.default_left[i].is_set();

            let is_categorical = doc.split_type.get(i).copied() == Some(SPLIT_TYPE_CATEGORICAL);
            if is_categorical {
                nodes.push(Node::Categorical {
                    feature,
                    categories: node_categories(doc, i)?,
                    default_left,
                    left,
                    right,
                });
            } else {
                nodes.push(Node::Numerical {
                    feature,
                    threshold: doc.split_conditions[i],
                    default_left,
                    left,
                    right,
                });
            }
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, features: &[f32]) -> f32 {
        let mut idx = 0;
        // Children always have a larger index than their parent (checked at load)
        loop {
            idx = match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Numerical {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let x = features[*feature];
                    if x.is_nan() {
                        if *default_left {
                            *left
                        } else {
                            *right
                        }
                    } else if x < *threshold {
                        *left
                    } else {
                        *right
                    }
                }
                Node::Categorical {
                    feature,
                    categories,
                    default_left,
                    left,
                    right,
                } => {
                    let x = features[*feature];
                    if x.is_nan() {
                        if *default_left {
                            *left
                        } else {
                            *right
                        }
                    } else if x >= 0.0 && categories.binary_search(&(x as u32)).is_ok() {
                        *right
                    } else {
                        *left
                    }
                }
            };
        }
    }
}

fn child_index(raw: i32, parent: usize, n: usize) -> Result<usize, String> {
    if raw < 0 || raw as usize >= n || raw as usize <= parent {
        return Err(format!("node {} has invalid child {}", parent, raw));
    }
    Ok(raw as usize)
}

fn node_categories(doc: &TreeDocument, node: usize) -> Result<Vec<u32>, String> {
    let k = doc
        .categories_nodes
        .iter()
        .position(|&n| n == node)
        .ok_or_else(|| format!("categorical node {} has no category set", node))?;
    let (segment, size) = match (doc.categories_segments.get(k), doc.categories_sizes.get(k)) {
        (Some(&segment), Some(&size)) => (segment, size),
        _ => return Err(format!("categorical node {} has no segment", node)),
    };
    let mut categories = doc
        .categories
        .get(segment..segment + size)
        .ok_or_else(|| format!("categorical node {} segment out of range", node))?
        .to_vec();
    categories.sort_unstable();
    Ok(categories)
}

fn parse_base_score(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let value: f64 = trimmed
        .trim()
        .parse()
        .map_err(|_| format!("invalid base_score {:?}", raw))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("non-finite base_score {:?}", raw))
    }
}

/// A loaded, validated tree ensemble.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    base_score: f64,
    num_features: usize,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub(crate) fn from_learner(learner: &LearnerDocument, num_features: usize) -> Result<Self, String> {
        if learner.gradient_booster.name != "gbtree" {
            return Err(format!(
                "unsupported booster {:?}, expected \"gbtree\"",
                learner.gradient_booster.name
            ));
        }
        if let Some(objective) = &learner.objective {
            if !IDENTITY_OBJECTIVES.contains(&objective.name.as_str()) {
                return Err(format!("unsupported objective {:?}", objective.name));
            }
        }

        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let trees = learner
            .gradient_booster
            .model
            .trees
            .iter()
            .enumerate()
            .map(|(i, doc)| Tree::from_document(doc, num_features).map_err(|e| format!("tree {}: {}", i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base_score,
            num_features,
            trees,
        })
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw model output for one encoded row (NaN marks a missing value).
    ///
    /// Panics if `features` does not hold exactly [`Self::num_features`] values.
    pub fn predict_margin(&self, features: &[f32]) -> f64 {
        assert_eq!(
            features.len(),
            self.num_features,
            "feature vector length does not match the ensemble"
        );
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| f64::from(tree.leaf_value(features)))
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(json: &str) -> TreeDocument {
        serde_json::from_str(json).unwrap()
    }

    fn stump() -> TreeDocument {
        tree(
            r#"{
                "left_children": [1, -1, -1],
                "right_children": [2, -1, -1],
                "split_indices": [0, 0, 0],
                "split_conditions": [100.0, -0.5, 0.5],
                "default_left": [1, 0, 0],
                "split_type": [0, 0, 0]
            }"#,
        )
    }

    fn categorical_stump() -> TreeDocument {
        tree(
            r#"{
                "left_children": [1, -1, -1],
                "right_children": [2, -1, -1],
                "split_indices": [1, 0, 0],
                "split_conditions": [0.0, 1.0, 2.0],
                "default_left": [false, false, false],
                "split_type": [1, 0, 0],
                "categories": [3, 0],
                "categories_nodes": [0],
                "categories_segments": [0],
                "categories_sizes": [2]
            }"#,
        )
    }

    #[test]
    fn test_numerical_split() {
        let t = Tree::from_document(&stump(), 2).unwrap();
        assert_eq!(t.leaf_value(&[99.0, 0.0]), -0.5);
        assert_eq!(t.leaf_value(&[100.0, 0.0]), 0.5);
        // Missing goes to the default (left) side
        assert_eq!(t.leaf_value(&[f32::NAN, 0.0]), -0.5);
    }

    #[test]
    fn test_categorical_split() {
        let t = Tree::from_document(&categorical_stump(), 2).unwrap();
        assert_eq!(t.leaf_value(&[0.0, 0.0]), 2.0);
        assert_eq!(t.leaf_value(&[0.0, 3.0]), 2.0);
        assert_eq!(t.leaf_value(&[0.0, 1.0]), 1.0);
        // Missing goes to the default (right) side
        assert_eq!(t.leaf_value(&[0.0, f32::NAN]), 2.0);
    }

    #[test]
    fn test_feature_out_of_range() {
        let err = Tree::from_document(&stump(), 0).unwrap_err();
        assert!(err.contains("feature 0"));
    }

    #[test]
    fn test_backward_child_rejected() {
        let doc = tree(
            r#"{
                "left_children": [0, -1],
                "right_children": [1, -1],
                "split_indices": [0, 0],
                "split_conditions": [1.0, 0.0],
                "default_left": [0, 0]
            }"#,
        );
        assert!(Tree::from_document(&doc, 1).is_err());
    }

    #[test]
    fn test_categorical_node_without_set() {
        let doc = tree(
            r#"{
                "left_children": [1, -1, -1],
                "right_children": [2, -1, -1],
                "split_indices": [0, 0, 0],
                "split_conditions": [0.0, 1.0, 2.0],
                "default_left": [0, 0, 0],
                "split_type": [1, 0, 0]
            }"#,
        );
        let err = Tree::from_document(&doc, 1).unwrap_err();
        assert!(err.contains("no category set"));
    }

    #[test]
    fn test_parse_base_score() {
        assert_eq!(parse_base_score("1.2E1").unwrap(), 12.0);
        assert_eq!(parse_base_score("[5E-1]").unwrap(), 0.5);
        assert!(parse_base_score("abc").is_err());
        assert!(parse_base_score("NaN").is_err());
    }
}
