//! Top-level compilation driver.
//!
//! Ties the stages together: locate the booster payload, normalize every
//! tree into the canonical forest, emit per-tree functions, and assemble the
//! final module. Per-tree work is independent and can run on a rayon pool;
//! results are always stitched back together in forest order, so parallel
//! and sequential runs produce byte-identical output.

use bon::Builder;
use serde_json::Value;

use crate::compat::{document, normalize_tree, FeatureResolver};
use crate::diagnostics::{Diagnostic, DiagnosticReport};
use crate::emit;
use crate::error::CompileError;
use crate::repr::{ClassAssignment, Forest, Tree};
use crate::utils::Parallelism;

/// Options controlling a compilation run.
///
/// # Example
///
/// ```
/// use timber::{CompileOptions, Parallelism};
///
/// let options = CompileOptions::builder()
///     .feature_names(vec!["age".into(), "glucose".into()])
///     .parallelism(Parallelism::Parallel)
///     .build();
/// ```
#[derive(Debug, Clone, Default, Builder)]
pub struct CompileOptions {
    /// Feature names for models that reference split features by name;
    /// position in the list is the feature-vector index.
    pub feature_names: Option<Vec<String>>,
    /// Whether per-tree normalization and emission may run on a rayon pool.
    #[builder(default)]
    pub parallelism: Parallelism,
}

/// The result of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Self-contained scoring module source exposing
    /// `export function predict(f)`.
    pub source: String,
    /// Non-fatal problems encountered along the way.
    pub report: DiagnosticReport,
    /// Number of trees compiled (stubs included).
    pub n_trees: usize,
    /// Number of output classes the module predicts over.
    pub n_classes: u32,
}

/// Compile a parsed model document with default options.
pub fn compile(doc: &Value) -> Result<Compiled, CompileError> {
    compile_with_options(doc, &CompileOptions::default())
}

/// Compile a model document from JSON text.
pub fn compile_str(json: &str) -> Result<Compiled, CompileError> {
    let doc: Value =
        serde_json::from_str(json).map_err(|e| CompileError::InvalidJson(e.to_string()))?;
    compile(&doc)
}

/// Compile a parsed model document.
pub fn compile_with_options(
    doc: &Value,
    options: &CompileOptions,
) -> Result<Compiled, CompileError> {
    let (forest, report) = parse_forest(doc, options)?;

    let trees: Vec<(usize, &Tree)> = forest.trees().enumerate().collect();
    let sources = options
        .parallelism
        .maybe_par_map(trees, |(i, tree)| emit::emit_tree(tree, i));
    let source = emit::emit_module(&sources, &forest);

    Ok(Compiled {
        source,
        report,
        n_trees: forest.n_trees(),
        n_classes: forest.n_classes(),
    })
}

/// Normalize a model document into the canonical forest without emitting
/// code.
///
/// This is the compiler's front half; it doubles as the reference
/// interpreter entry point, since [`Forest::predict_proba`] reproduces what
/// the emitted module computes.
pub fn parse_forest(
    doc: &Value,
    options: &CompileOptions,
) -> Result<(Forest, DiagnosticReport), CompileError> {
    let booster = document::locate(doc)?;
    let resolver = FeatureResolver::new(options.feature_names.as_deref());
    let mut report = DiagnosticReport::new();

    let assignment = class_assignment(
        booster.tree_info.as_deref(),
        booster.trees.len(),
        booster.n_classes,
        &mut report,
    );

    let items: Vec<(usize, &Value)> = booster.trees.iter().enumerate().collect();
    let normalized = options
        .parallelism
        .maybe_par_map(items, |(i, raw)| normalize_tree(raw, i, &resolver));

    let mut forest = Forest::new(booster.n_classes).with_assignment(assignment);
    for result in normalized {
        let (tree, diagnostics) = result?;
        debug_assert!(tree.validate().is_ok(), "normalizer must produce valid trees");
        forest.push_tree(tree);
        for d in diagnostics {
            report.push(d);
        }
    }
    debug_assert!(forest.validate().is_ok());

    Ok((forest, report))
}

/// Build the class assignment from an optional explicit `tree_info` list.
///
/// A list of the wrong length falls back to round-robin (diagnosed);
/// out-of-range entries are folded into range by modulo (diagnosed).
fn class_assignment(
    tree_info: Option<&[i64]>,
    n_trees: usize,
    n_classes: u32,
    report: &mut DiagnosticReport,
) -> ClassAssignment {
    let Some(info) = tree_info else {
        return ClassAssignment::RoundRobin;
    };

    if info.len() != n_trees {
        report.push(Diagnostic::InconsistentClassMapping {
            expected: n_trees,
            actual: info.len(),
        });
        return ClassAssignment::RoundRobin;
    }

    let classes = info
        .iter()
        .enumerate()
        .map(|(tree_index, &class)| {
            let folded = class.rem_euclid(i64::from(n_classes)) as u32;
            if class < 0 || class >= i64::from(n_classes) {
                report.push(Diagnostic::ClassIndexOutOfRange {
                    tree_index,
                    class_index: class,
                });
            }
            folded
        })
        .collect();

    ClassAssignment::Explicit(classes)
}
