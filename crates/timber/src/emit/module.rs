//! Scoring-module assembly.
//!
//! Wraps the per-tree functions into one self-contained ES module exposing a
//! single `export function predict(f)`. The module inlines its own softmax
//! and depends on nothing at invocation time.

use crate::repr::{ClassAssignment, Forest};

const HEADER: &str = "// Auto-generated inline decision forest model. Do not edit manually.\n\n";

const SOFTMAX: &str = "\
function softmax(arr) {
  const m = Math.max(...arr);
  const exps = arr.map(v => Math.exp(v - m));
  const sum = exps.reduce((a, b) => a + b, 0);
  return exps.map(v => v / sum);
}
";

/// Assemble the final module from per-tree sources and the forest's class
/// metadata.
///
/// Logit accumulation is emitted in forest order. An explicit class
/// assignment unrolls into one `+=` statement per tree; round-robin emits an
/// index loop over the `trees` array. Summation order is therefore identical
/// to the reference interpreter's, which matters because floating-point
/// addition is not associative.
///
/// # Panics
///
/// Panics if `tree_sources.len()` differs from `forest.n_trees()`.
pub fn emit_module(tree_sources: &[String], forest: &Forest) -> String {
    assert_eq!(
        tree_sources.len(),
        forest.n_trees(),
        "one source per tree required"
    );

    let mut out = String::with_capacity(estimate_len(tree_sources));
    out.push_str(HEADER);

    for source in tree_sources {
        out.push_str(source);
        out.push('\n');
    }

    out.push_str("const trees = [\n");
    for i in 0..tree_sources.len() {
        out.push_str("  tree_");
        out.push_str(&i.to_string());
        out.push_str(if i + 1 < tree_sources.len() { ",\n" } else { "\n" });
    }
    out.push_str("];\n\n");

    out.push_str(SOFTMAX);
    out.push('\n');

    out.push_str("export function predict(f) {\n");
    out.push_str(&format!("  const numClasses = {};\n", forest.n_classes()));
    out.push_str("  let logits = new Array(numClasses).fill(0);\n");

    match forest.assignment() {
        ClassAssignment::Explicit(_) => {
            for i in 0..forest.n_trees() {
                out.push_str(&format!("  logits[{}] += tree_{i}(f);\n", forest.class_of(i)));
            }
        }
        ClassAssignment::RoundRobin => {
            out.push_str("  for (let i = 0; i < trees.length; i++) {\n");
            out.push_str("    logits[i % numClasses] += trees[i](f);\n");
            out.push_str("  }\n");
        }
    }

    out.push_str("  return softmax(logits);\n");
    out.push_str("}\n");
    out
}

fn estimate_len(tree_sources: &[String]) -> usize {
    tree_sources.iter().map(String::len).sum::<usize>() + 1024
}
