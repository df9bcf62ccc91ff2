//! Raw booster JSON support: schema detection and normalization.
//!
//! Serialized tree ensembles show up in three incompatible JSON encodings:
//!
//! 1. **Flat columnar**: parallel per-node arrays (`left_children`,
//!    `right_children`, `split_indices`, `split_conditions`, `base_weights`)
//! 2. **Nested node-object**: recursive objects carrying `nodeid`, `leaf` or
//!    split fields, with `children` lists and `yes`/`no`/`missing` id links
//! 3. **Flat node-list**: a `nodes` array of independent node objects
//!
//! [`TreeSchema::detect`] classifies a tree object once; the per-variant
//! normalizers then convert it into the canonical [`Tree`]. Whatever the
//! source encoding, all variants funnel through one arena assembler that
//! remaps source node ids onto dense ids, resolves references, and degrades
//! dangling or repeated references to implicit `0.0` leaves.

mod columnar;
pub mod document;
mod node_object;

use std::collections::HashMap;

use serde_json::Value;

use crate::diagnostics::Diagnostic;
use crate::error::CompileError;
use crate::repr::{Tree, TreeBuilder};

/// Sentinel id used for an absent child reference, mirroring the source
/// convention of negative ids meaning "no child".
const NO_CHILD: i64 = -1;

/// The raw tree encodings this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSchema {
    /// Parallel per-node arrays keyed by node position.
    FlatColumnar,
    /// Recursive node objects with `nodeid` ids and `yes`/`no` links.
    NestedNodeObject,
    /// A `nodes` array of independent node objects.
    FlatNodeList,
    /// None of the above; the tree degrades to a stub.
    Unrecognized,
}

impl TreeSchema {
    /// Structurally classify one raw tree object.
    ///
    /// First match wins: columnar arrays, then nested node-object markers,
    /// then a `nodes` list. As a last resort a nested object carrying
    /// `nodeid` anywhere inside still counts as the nested form.
    pub fn detect(tree: &Value) -> Self {
        let Some(obj) = tree.as_object() else {
            return TreeSchema::Unrecognized;
        };

        if obj.get("left_children").is_some_and(Value::is_array)
            || obj.get("right_children").is_some_and(Value::is_array)
        {
            return TreeSchema::FlatColumnar;
        }
        if obj.contains_key("nodeid")
            || obj.contains_key("children")
            || obj.contains_key("leaf")
            || obj.contains_key("split_condition")
        {
            return TreeSchema::NestedNodeObject;
        }
        if obj.get("nodes").is_some_and(Value::is_array) {
            return TreeSchema::FlatNodeList;
        }
        if node_object::find_node_object(tree).is_some() {
            return TreeSchema::NestedNodeObject;
        }
        TreeSchema::Unrecognized
    }
}

/// Normalize one raw tree object into a canonical [`Tree`].
///
/// Never fails on malformed structure: unrecognizable trees become the
/// constant-zero stub and broken references become implicit `0.0` leaves,
/// with the damage recorded in the returned diagnostics. The only error is
/// an unmappable feature reference, which is fatal for the whole compile.
pub fn normalize_tree(
    tree: &Value,
    tree_index: usize,
    resolver: &FeatureResolver<'_>,
) -> Result<(Tree, Vec<Diagnostic>), CompileError> {
    let mut diagnostics = Vec::new();
    let tree = match TreeSchema::detect(tree) {
        TreeSchema::FlatColumnar => {
            columnar::normalize(tree, tree_index, resolver, &mut diagnostics)?
        }
        TreeSchema::NestedNodeObject => {
            node_object::normalize_nested(tree, tree_index, resolver, &mut diagnostics)?
        }
        TreeSchema::FlatNodeList => {
            node_object::normalize_node_list(tree, tree_index, resolver, &mut diagnostics)?
        }
        TreeSchema::Unrecognized => {
            diagnostics.push(Diagnostic::UnrecognizedTreeSchema { tree_index });
            Tree::stub()
        }
    };
    Ok((tree, diagnostics))
}

// =============================================================================
// Feature references
// =============================================================================

/// Resolves raw split-feature references to feature-vector indices.
///
/// Accepts non-negative integers and numeric strings directly. A name
/// string is looked up in the caller-supplied feature-name table (position
/// is the index). Anything else is a hard error: silently guessing an index
/// would score against the wrong feature.
#[derive(Debug, Default)]
pub struct FeatureResolver<'a> {
    names: Option<HashMap<&'a str, u32>>,
}

impl<'a> FeatureResolver<'a> {
    pub fn new(feature_names: Option<&'a [String]>) -> Self {
        Self {
            names: feature_names.map(|names| {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| (n.as_str(), i as u32))
                    .collect()
            }),
        }
    }

    /// Resolve a raw feature reference from the source JSON.
    pub fn resolve(&self, raw: &Value, tree_index: usize) -> Result<u32, CompileError> {
        match raw {
            Value::Number(n) => {
                if let Some(idx) = n.as_u64().and_then(|v| u32::try_from(v).ok()) {
                    return Ok(idx);
                }
            }
            Value::String(s) => {
                let t = s.trim();
                if let Ok(idx) = t.parse::<u32>() {
                    return Ok(idx);
                }
                if let Some(idx) = self.names.as_ref().and_then(|m| m.get(t).copied()) {
                    return Ok(idx);
                }
            }
            _ => {}
        }
        Err(CompileError::UnresolvableFeature {
            tree_index,
            name: raw_to_name(raw),
        })
    }
}

fn raw_to_name(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Shared arena assembly
// =============================================================================

/// Split payload extracted from a source node, still in source-id space.
pub(crate) struct RawSplit {
    pub feature: u32,
    pub threshold: f64,
    /// Child taken when `feature <= threshold`; [`NO_CHILD`] if absent.
    pub yes: i64,
    /// Child taken when `feature > threshold`; [`NO_CHILD`] if absent.
    pub no: i64,
    pub default_yes: bool,
}

/// A source node decoded just far enough to assemble the canonical arena.
pub(crate) enum RawNode {
    Leaf(f64),
    Split(RawSplit),
}

/// Assemble a canonical tree by walking source nodes from `root`.
///
/// `fetch` looks a node up by source id (`Ok(None)` = no such node). Source
/// ids are remapped onto dense arena ids in visit order, root first. A
/// reference to a missing node, an absent reference, or a reference to a
/// node that was already placed (which would make the structure a DAG or a
/// cycle, not a tree) all become implicit `0.0` leaves with an
/// [`Diagnostic::UnresolvableReference`] recorded.
pub(crate) fn assemble_tree<F>(
    root: i64,
    fetch: F,
    tree_index: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Tree, CompileError>
where
    F: Fn(i64) -> Result<Option<RawNode>, CompileError>,
{
    let mut builder = TreeBuilder::new();
    let mut dense: HashMap<i64, u32> = HashMap::new();

    let root_dense = builder.alloc();
    dense.insert(root, root_dense);
    let mut stack: Vec<(i64, u32)> = vec![(root, root_dense)];

    while let Some((source_id, dense_id)) = stack.pop() {
        match fetch(source_id)? {
            None => {
                diagnostics.push(Diagnostic::UnresolvableReference {
                    tree_index,
                    node_id: source_id,
                });
                builder.set_leaf(dense_id, 0.0);
            }
            Some(RawNode::Leaf(value)) => builder.set_leaf(dense_id, value),
            Some(RawNode::Split(split)) => {
                let yes_dense = resolve_child(
                    split.yes,
                    &mut builder,
                    &mut dense,
                    &mut stack,
                    tree_index,
                    diagnostics,
                );
                let no_dense = resolve_child(
                    split.no,
                    &mut builder,
                    &mut dense,
                    &mut stack,
                    tree_index,
                    diagnostics,
                );
                builder.set_split(
                    dense_id,
                    split.feature,
                    split.threshold,
                    split.default_yes,
                    yes_dense,
                    no_dense,
                );
            }
        }
    }

    Ok(builder.freeze())
}

/// Map one child reference to a dense id, degrading broken references to
/// implicit leaves.
fn resolve_child(
    child: i64,
    builder: &mut TreeBuilder,
    dense: &mut HashMap<i64, u32>,
    stack: &mut Vec<(i64, u32)>,
    tree_index: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> u32 {
    if child == NO_CHILD || dense.contains_key(&child) {
        diagnostics.push(Diagnostic::UnresolvableReference {
            tree_index,
            node_id: child,
        });
        let leaf = builder.alloc();
        builder.set_leaf(leaf, 0.0);
        return leaf;
    }
    let dense_id = builder.alloc();
    dense.insert(child, dense_id);
    stack.push((child, dense_id));
    dense_id
}

// =============================================================================
// Flexible scalar accessors
// =============================================================================

/// Read a JSON value as an integer, accepting numbers, integral floats, and
/// numeric strings. Booster dumps are not consistent about which they use.
pub(crate) fn value_as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a JSON value as a float, accepting numbers and numeric strings.
pub(crate) fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
