//! Per-tree code emission.
//!
//! Compiles one canonical tree into a pure scoring function of the shape
//!
//! ```text
//! function tree_3(f) {
//!   if (f[0] <= 0.5 || Number.isNaN(f[0])) {
//!     return 1.0;
//!   } else {
//!     return -1.0;
//!   }
//! }
//! ```
//!
//! The `yes` branch is always the `<=` branch; when the node's default
//! branch for missing values is `yes`, the condition carries an explicit
//! `Number.isNaN` alternative so NaN routes the same way the canonical tree
//! does (a bare `<=` is false for NaN, which already routes to `no`).

use super::literal::format_f64;
use crate::repr::{NodeId, Tree};

/// Emission is iterative; frames interleave node visits with literal text
/// so branches close in the right order.
enum Frame {
    Visit { node: NodeId, indent: usize },
    Text { text: &'static str, indent: usize },
}

/// Emit `function tree_<index>(f) { ... }` for one canonical tree.
///
/// Degenerate trees (and any tree whose structure would visit more nodes
/// than it has, which a validated tree cannot) compile to the constant-zero
/// stub function.
pub fn emit_tree(tree: &Tree, index: usize) -> String {
    match emit_body(tree) {
        Some(body) => format!("function tree_{index}(f) {{\n{body}}}\n"),
        None => stub_function(index),
    }
}

/// The constant-zero fallback function.
pub fn stub_function(index: usize) -> String {
    format!("function tree_{index}(f) {{ return 0.0; }}\n")
}

fn emit_body(tree: &Tree) -> Option<String> {
    if tree.n_nodes() == 0 {
        return None;
    }

    let mut out = String::new();
    let mut visits = 0usize;
    let mut stack = vec![Frame::Visit { node: 0, indent: 1 }];

    while let Some(frame) = stack.pop() {
        let (node, indent) = match frame {
            Frame::Text { text, indent } => {
                push_indented(&mut out, indent, text);
                continue;
            }
            Frame::Visit { node, indent } => (node, indent),
        };

        // A tree visits each node exactly once; exceeding the node count
        // means the structure is not a tree.
        visits += 1;
        if visits > tree.n_nodes() {
            return None;
        }

        if tree.is_leaf(node) {
            let line = format!("return {};", format_f64(tree.leaf_value(node)));
            push_indented(&mut out, indent, &line);
            continue;
        }

        let feature = tree.split_index(node);
        let threshold = format_f64(tree.split_threshold(node));
        let condition = if tree.default_yes(node) {
            format!("if (f[{feature}] <= {threshold} || Number.isNaN(f[{feature}])) {{")
        } else {
            format!("if (f[{feature}] <= {threshold}) {{")
        };
        push_indented(&mut out, indent, &condition);

        stack.push(Frame::Text { text: "}", indent });
        stack.push(Frame::Visit {
            node: tree.no_child(node),
            indent: indent + 1,
        });
        stack.push(Frame::Text {
            text: "} else {",
            indent,
        });
        stack.push(Frame::Visit {
            node: tree.yes_child(node),
            indent: indent + 1,
        });
    }

    Some(out)
}

fn push_indented(out: &mut String, indent: usize, line: &str) {
    for _ in 0..indent {
        out.push_str("  ");
    }
    out.push_str(line);
    out.push('\n');
}
