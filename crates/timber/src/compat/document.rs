//! Locating the booster payload inside a model document.
//!
//! Model JSON nests the tree list at a handful of known depths depending on
//! which library and version wrote it. The locator probes those paths in
//! order and falls back to a structural scan for the first object carrying a
//! `trees` array. Class metadata (`num_class`, `tree_info`) is read with the
//! same tolerance: integers arrive both as JSON numbers and as stringified
//! numbers.

use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::value_as_i64;
use crate::error::CompileError;

/// Known nesting depths for the booster section, probed in order.
const SECTION_PATHS: &[&[&str]] = &[
    &["learner", "gradient_booster", "model"],
    &["learner", "gradient_booster"],
    &["learner", "gradient_booster", "model", "gbtree"],
];

/// The booster payload extracted from a model document.
#[derive(Debug)]
pub struct BoosterDocument<'a> {
    /// Raw tree objects, in serialization order.
    pub trees: &'a [Value],
    /// Explicit per-tree class indices, when present and non-empty.
    pub tree_info: Option<Vec<i64>>,
    /// Output class count, clamped to at least 1.
    pub n_classes: u32,
}

/// Model parameters as serialized by the upstream trainer (integers are
/// stringified there).
#[serde_as]
#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default = "default_num_class")]
    num_class: i64,
}

fn default_num_class() -> i64 {
    1
}

/// Locate the trees list and class metadata in `doc`.
///
/// The absence of any trees list is the one fatal input condition: there is
/// nothing meaningful to compile.
pub fn locate(doc: &Value) -> Result<BoosterDocument<'_>, CompileError> {
    let section = SECTION_PATHS
        .iter()
        .filter_map(|path| lookup_path(doc, path))
        .find(|section| trees_of(section).is_some())
        .or_else(|| scan_for_trees(doc))
        .ok_or(CompileError::MissingTreeList)?;

    let trees = trees_of(section).ok_or(CompileError::MissingTreeList)?;

    let tree_info = section
        .get("tree_info")
        .or_else(|| lookup_path(doc, &["learner", "gradient_booster", "model", "tree_info"]))
        .and_then(Value::as_array)
        .filter(|info| !info.is_empty())
        .map(|info| {
            info.iter()
                .map(|v| value_as_i64(v).unwrap_or(0))
                .collect::<Vec<_>>()
        });

    Ok(BoosterDocument {
        trees,
        tree_info,
        n_classes: read_num_class(doc, section).clamp(1, i64::from(u32::MAX)) as u32,
    })
}

fn trees_of<'a>(section: &'a Value) -> Option<&'a [Value]> {
    section
        .get("trees")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

fn lookup_path<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = doc;
    for key in path {
        cur = cur.get(key)?;
    }
    Some(cur)
}

/// Depth-first scan for the first object holding a `trees` array.
fn scan_for_trees(doc: &Value) -> Option<&Value> {
    let mut stack = vec![doc];
    while let Some(v) = stack.pop() {
        match v {
            Value::Object(map) => {
                if trees_of(v).is_some() {
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

fn read_num_class(doc: &Value, section: &Value) -> i64 {
    if let Some(param) = lookup_path(doc, &["learner", "learner_model_param"]) {
        if let Ok(param) = serde_json::from_value::<LearnerModelParam>(param.clone()) {
            return param.num_class;
        }
    }
    lookup_path(
        doc,
        &["learner", "objective", "softmax_multiclass_param", "num_class"],
    )
    .or_else(|| section.get("num_class"))
    .or_else(|| doc.get("num_class"))
    .and_then(value_as_i64)
    .unwrap_or(1)
}
