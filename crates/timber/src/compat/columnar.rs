//! Flat columnar tree normalization.
//!
//! The columnar form serializes one tree as parallel per-node arrays, the
//! layout used by the upstream trainer's model JSON: `left_children`,
//! `right_children`, `split_indices`, `split_conditions`, `base_weights`,
//! and optionally `default_left`. Node `i` is a leaf iff both child entries
//! are negative.

use serde::Deserialize;
use serde_json::Value;

use super::{assemble_tree, FeatureResolver, RawNode, RawSplit, NO_CHILD};
use crate::diagnostics::Diagnostic;
use crate::error::CompileError;
use crate::repr::Tree;

/// A boolean serialized as either an integer or a bool, depending on the
/// dump's vintage.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum IntOrBool {
    Int(i64),
    Bool(bool),
}

impl IntOrBool {
    fn as_bool(self) -> bool {
        match self {
            IntOrBool::Int(i) => i != 0,
            IntOrBool::Bool(b) => b,
        }
    }
}

/// Parallel-array tree payload.
#[derive(Debug, Clone, Default, Deserialize)]
struct ColumnarTree {
    #[serde(default)]
    left_children: Vec<i64>,
    #[serde(default)]
    right_children: Vec<i64>,
    #[serde(default)]
    split_indices: Vec<i64>,
    #[serde(default)]
    split_conditions: Vec<f64>,
    #[serde(default)]
    base_weights: Vec<f64>,
    #[serde(default)]
    default_left: Vec<IntOrBool>,
}

impl ColumnarTree {
    /// Node count: the arrays are not guaranteed to agree, so take the
    /// longest structural array and treat missing entries as absent.
    fn n_nodes(&self) -> usize {
        self.left_children
            .len()
            .max(self.right_children.len())
            .max(self.split_indices.len())
            .max(self.split_conditions.len())
    }

    fn is_leaf(&self, i: usize) -> bool {
        self.left_children.get(i).copied().unwrap_or(NO_CHILD) < 0
            && self.right_children.get(i).copied().unwrap_or(NO_CHILD) < 0
    }

    /// Resolve per-node leaf values.
    ///
    /// Priority: positional when the value array spans all nodes; positional
    /// among leaf indices when it spans exactly the leaves; otherwise the
    /// first available scalar is broadcast to every leaf (degraded).
    fn leaf_values(&self, tree_index: usize, diagnostics: &mut Vec<Diagnostic>) -> Vec<f64> {
        let n = self.n_nodes();
        if self.base_weights.len() == n {
            return self.base_weights.clone();
        }

        let leaves: Vec<usize> = (0..n).filter(|&i| self.is_leaf(i)).collect();
        let mut values = vec![0.0; n];
        if !leaves.is_empty() && self.base_weights.len() == leaves.len() {
            for (&node, &value) in leaves.iter().zip(self.base_weights.iter()) {
                values[node] = value;
            }
            return values;
        }

        let broadcast = self.base_weights.first().copied().unwrap_or(0.0);
        for &node in &leaves {
            values[node] = broadcast;
        }
        if !leaves.is_empty() {
            diagnostics.push(Diagnostic::BroadcastLeafValues { tree_index });
        }
        values
    }
}

pub(super) fn normalize(
    tree: &Value,
    tree_index: usize,
    resolver: &FeatureResolver<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Tree, CompileError> {
    let Ok(cols) = serde_json::from_value::<ColumnarTree>(tree.clone()) else {
        diagnostics.push(Diagnostic::UnrecognizedTreeSchema { tree_index });
        return Ok(Tree::stub());
    };

    let n = cols.n_nodes();
    if n == 0 {
        return Ok(Tree::stub());
    }

    let leaf_values = cols.leaf_values(tree_index, diagnostics);

    assemble_tree(
        0,
        |id| {
            if id < 0 || id as usize >= n {
                return Ok(None);
            }
            let i = id as usize;
            if cols.is_leaf(i) {
                return Ok(Some(RawNode::Leaf(leaf_values[i])));
            }

            let raw_feature = cols.split_indices.get(i).copied().unwrap_or(0);
            let feature = resolver.resolve(&Value::from(raw_feature), tree_index)?;
            Ok(Some(RawNode::Split(RawSplit {
                feature,
                threshold: cols.split_conditions.get(i).copied().unwrap_or(0.0),
                yes: cols.left_children.get(i).copied().unwrap_or(NO_CHILD),
                no: cols.right_children.get(i).copied().unwrap_or(NO_CHILD),
                default_yes: cols
                    .default_left
                    .get(i)
                    .map(|d| d.as_bool())
                    .unwrap_or(true),
            })))
        },
        tree_index,
        diagnostics,
    )
}
