//! Nested node-object and flat node-list normalization.
//!
//! Both forms describe nodes as JSON objects carrying their own `nodeid`.
//! The nested form reaches children through `children` lists (or `left`/
//! `right` objects) and links them logically via `yes`/`no`/`missing` id
//! references; the flat form just lists every node in a `nodes` array. Both
//! collapse to an id -> node table and share one normalization path.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{
    assemble_tree, value_as_f64, value_as_i64, FeatureResolver, RawNode, RawSplit, NO_CHILD,
};
use crate::diagnostics::Diagnostic;
use crate::error::CompileError;
use crate::repr::Tree;

/// Find the first descendant object carrying a `nodeid`, used when the tree
/// wrapper itself is not a node.
pub(super) fn find_node_object(value: &Value) -> Option<&Value> {
    let mut stack = vec![value];
    while let Some(v) = stack.pop() {
        match v {
            Value::Object(map) => {
                if map.contains_key("nodeid") {
                    return Some(v);
                }
                stack.extend(map.values());
            }
            Value::Array(items) => stack.extend(items.iter()),
            _ => {}
        }
    }
    None
}

/// Collect every node reachable from `root` into an id -> node table.
///
/// Traversal makes no ordering assumption: it descends through `children`
/// (list or single object) and `left`/`right` object fields, keeping the
/// first node seen for each id.
fn collect_node_table(root: &Value) -> BTreeMap<i64, &Value> {
    let mut table = BTreeMap::new();
    let mut stack = vec![root];
    while let Some(v) = stack.pop() {
        let Some(obj) = v.as_object() else { continue };
        if let Some(id) = obj.get("nodeid").and_then(value_as_i64) {
            table.entry(id).or_insert(v);
        }
        match obj.get("children") {
            Some(Value::Array(items)) => stack.extend(items.iter()),
            Some(child @ Value::Object(_)) => stack.push(child),
            _ => {}
        }
        for key in ["left", "right"] {
            if let Some(child @ Value::Object(_)) = obj.get(key) {
                stack.push(child);
            }
        }
    }
    table
}

/// Whether this object is itself usable as a tree root.
fn is_node_like(tree: &Value) -> bool {
    tree.as_object().is_some_and(|obj| {
        obj.contains_key("nodeid")
            || obj.contains_key("children")
            || obj.contains_key("leaf")
            || obj.contains_key("split_condition")
    })
}

pub(super) fn normalize_nested(
    tree: &Value,
    tree_index: usize,
    resolver: &FeatureResolver<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Tree, CompileError> {
    let root = if is_node_like(tree) {
        tree
    } else {
        find_node_object(tree).unwrap_or(tree)
    };
    normalize_table(collect_node_table(root), tree_index, resolver, diagnostics)
}

pub(super) fn normalize_node_list(
    tree: &Value,
    tree_index: usize,
    resolver: &FeatureResolver<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Tree, CompileError> {
    let mut table = BTreeMap::new();
    if let Some(nodes) = tree.get("nodes").and_then(Value::as_array) {
        for node in nodes {
            if let Some(id) = node.get("nodeid").and_then(value_as_i64) {
                table.entry(id).or_insert(node);
            }
        }
    }
    normalize_table(table, tree_index, resolver, diagnostics)
}

fn normalize_table(
    table: BTreeMap<i64, &Value>,
    tree_index: usize,
    resolver: &FeatureResolver<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Tree, CompileError> {
    if table.is_empty() {
        diagnostics.push(Diagnostic::UnrecognizedTreeSchema { tree_index });
        return Ok(Tree::stub());
    }

    // Root is node 0 when present, otherwise the smallest id.
    let root_id = if table.contains_key(&0) {
        0
    } else {
        *table.keys().next().expect("table is non-empty")
    };

    assemble_tree(
        root_id,
        |id| match table.get(&id) {
            None => Ok(None),
            Some(node) => raw_node(node, tree_index, resolver).map(Some),
        },
        tree_index,
        diagnostics,
    )
}

/// Decode one node object into leaf/split payload, in source-id space.
fn raw_node(
    node: &Value,
    tree_index: usize,
    resolver: &FeatureResolver<'_>,
) -> Result<RawNode, CompileError> {
    if let Some(leaf) = node.get("leaf") {
        return Ok(RawNode::Leaf(value_as_f64(leaf).unwrap_or(0.0)));
    }

    let feature = match node
        .get("split_index")
        .or_else(|| node.get("split_feature"))
        .or_else(|| node.get("split"))
    {
        Some(raw) => resolver.resolve(raw, tree_index)?,
        None => 0,
    };

    let threshold = node
        .get("split_condition")
        .or_else(|| node.get("threshold"))
        .and_then(value_as_f64)
        .unwrap_or(0.0);

    let mut yes = node.get("yes").and_then(value_as_i64);
    let mut no = node.get("no").and_then(value_as_i64);

    // No explicit links: fall back to the first two children in encounter
    // order.
    if yes.is_none() || no.is_none() {
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            if children.len() >= 2 {
                yes = children[0].get("nodeid").and_then(value_as_i64);
                no = children[1].get("nodeid").and_then(value_as_i64);
            }
        }
    }

    let yes = yes.unwrap_or(NO_CHILD);
    let no = no.unwrap_or(NO_CHILD);

    // Missing values follow the yes branch unless `missing` names the no
    // child.
    let default_yes = match node.get("missing").and_then(value_as_i64) {
        Some(m) => !(m == no && m != yes),
        None => true,
    };

    Ok(RawNode::Split(RawSplit {
        feature,
        threshold,
        yes,
        no,
        default_yes,
    }))
}
