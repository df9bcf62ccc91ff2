//! Property tests: softmax invariants and round-trip exactness between the
//! reference interpreter and the emitted source.
//!
//! The emitted tree functions use a three-shape grammar (`if`/`else`/
//! `return`), so a small test-local evaluator can execute them against a
//! feature vector and the result can be compared bit-for-bit with
//! `Tree::score_row`.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use timber::emit::emit_tree;
use timber::transform::softmax_inplace;
use timber::{compile, parse_forest, CompileOptions, Tree, TreeBuilder};

// =============================================================================
// Emitted-source evaluator
// =============================================================================

/// Evaluate one emitted `function tree_N(f) { ... }` against a feature row.
fn eval_tree_fn(source: &str, features: &[f64]) -> f64 {
    let lines: Vec<&str> = source
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    assert!(lines[0].starts_with("function tree_"), "not a tree function");

    if lines.len() == 1 {
        // One-line stub: `function tree_N(f) { return 0.0; }`.
        return 0.0;
    }
    eval_block(&lines[1..lines.len() - 1], 0, features)
}

fn eval_block(lines: &[&str], pos: usize, features: &[f64]) -> f64 {
    let line = lines[pos];
    if let Some(rest) = line.strip_prefix("return ") {
        let lit = rest.strip_suffix(';').expect("return ends with ;");
        return parse_literal(lit);
    }

    let (feature, threshold, nan_goes_yes) = parse_condition(line);
    let value = features.get(feature).copied().unwrap_or(f64::NAN);
    let take_yes = if value.is_nan() {
        nan_goes_yes
    } else {
        value <= threshold
    };

    let else_pos = matching_else(lines, pos);
    if take_yes {
        eval_block(lines, pos + 1, features)
    } else {
        eval_block(lines, else_pos + 1, features)
    }
}

/// Parse `if (f[I] <= T) {` or `if (f[I] <= T || Number.isNaN(f[I])) {`.
fn parse_condition(line: &str) -> (usize, f64, bool) {
    let inner = line
        .strip_prefix("if (f[")
        .unwrap_or_else(|| panic!("unexpected line: {line}"));
    let (idx, rest) = inner.split_once("] <= ").expect("comparison");
    let nan_goes_yes = rest.contains("Number.isNaN");
    let lit_end = rest
        .find(" ||")
        .or_else(|| rest.find(") {"))
        .expect("condition terminator");
    (
        idx.parse().expect("feature index"),
        parse_literal(&rest[..lit_end]),
        nan_goes_yes,
    )
}

fn parse_literal(lit: &str) -> f64 {
    match lit {
        "Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => lit.parse().expect("numeric literal"),
    }
}

/// Index of the `} else {` belonging to the `if` at `if_pos`.
fn matching_else(lines: &[&str], if_pos: usize) -> usize {
    let mut depth = 0usize;
    for (i, line) in lines.iter().enumerate().skip(if_pos) {
        if line.starts_with("if (") {
            depth += 1;
        } else if *line == "} else {" {
            if depth == 1 {
                return i;
            }
        } else if *line == "}" {
            depth -= 1;
        }
    }
    panic!("unbalanced emitted source");
}

/// Extract `function tree_<index>(f)` out of a full emitted module.
fn extract_tree_fn(module: &str, index: usize) -> String {
    let header = format!("function tree_{index}(f) {{");
    let start = module.find(&header).expect("tree function present");
    let rest = &module[start..];
    if let Some(one_line_end) = rest.lines().next().filter(|l| l.ends_with('}')) {
        if one_line_end.contains("return") {
            return one_line_end.to_string();
        }
    }
    let end = rest.find("\n}\n").expect("function close") + 3;
    rest[..end].to_string()
}

// =============================================================================
// Random tree generators
// =============================================================================

/// A tree whose leftmost spine has exactly `depth` splits; every off-spine
/// child is a random leaf.
fn spine_tree(rng: &mut StdRng, depth: usize, n_features: u32) -> Tree {
    let mut b = TreeBuilder::new();
    let mut node = b.alloc();
    for _ in 0..depth {
        let yes = b.alloc();
        let no = b.alloc();
        let feature = rng.random_range(0..n_features);
        let threshold = rng.random_range(-10.0..10.0);
        let default_yes = rng.random_bool(0.5);
        // Continue the spine down the yes side, leaf on the no side.
        b.set_split(node, feature, threshold, default_yes, yes, no);
        b.set_leaf(no, rng.random_range(-100.0..100.0));
        node = yes;
    }
    b.set_leaf(node, rng.random_range(-100.0..100.0));
    b.freeze()
}

/// A random tree where every branch splits further with probability decaying
/// away from the root.
fn random_tree(rng: &mut StdRng, max_depth: usize, n_features: u32) -> Tree {
    fn fill(b: &mut TreeBuilder, node: u32, rng: &mut StdRng, depth_left: usize, n_features: u32) {
        let split = depth_left > 0 && rng.random_bool(0.7);
        if !split {
            b.set_leaf(node, rng.random_range(-100.0..100.0));
            return;
        }
        let yes = b.alloc();
        let no = b.alloc();
        b.set_split(
            node,
            rng.random_range(0..n_features),
            rng.random_range(-10.0..10.0),
            rng.random_bool(0.5),
            yes,
            no,
        );
        fill(b, yes, rng, depth_left - 1, n_features);
        fill(b, no, rng, depth_left - 1, n_features);
    }

    let mut b = TreeBuilder::new();
    let root = b.alloc();
    fill(&mut b, root, rng, max_depth, n_features);
    b.freeze()
}

fn random_features(rng: &mut StdRng, n_features: u32, nan_probability: f64) -> Vec<f64> {
    (0..n_features)
        .map(|_| {
            if rng.random_bool(nan_probability) {
                f64::NAN
            } else {
                rng.random_range(-12.0..12.0)
            }
        })
        .collect()
}

// =============================================================================
// Round-trip exactness
// =============================================================================

#[test]
fn emitted_source_matches_interpreter_for_all_depths() {
    let mut rng = StdRng::seed_from_u64(42);
    let n_features = 4;

    for depth in 0..=20 {
        let tree = spine_tree(&mut rng, depth, n_features);
        tree.validate().expect("generated tree must be valid");
        let source = emit_tree(&tree, 0);

        for _ in 0..50 {
            let features = random_features(&mut rng, n_features, 0.1);
            let expected = tree.score_row(&features);
            let actual = eval_tree_fn(&source, &features);
            assert_eq!(
                expected.to_bits(),
                actual.to_bits(),
                "depth {depth}, features {features:?}"
            );
        }
    }
}

#[test]
fn emitted_source_matches_interpreter_for_random_shapes() {
    let mut rng = StdRng::seed_from_u64(7);
    let n_features = 6;

    for _ in 0..100 {
        let tree = random_tree(&mut rng, 8, n_features);
        let source = emit_tree(&tree, 3);

        for _ in 0..20 {
            let features = random_features(&mut rng, n_features, 0.15);
            assert_eq!(
                tree.score_row(&features).to_bits(),
                eval_tree_fn(&source, &features).to_bits()
            );
        }
    }
}

#[test]
fn compiled_module_agrees_with_reference_predictions() {
    // Mixed-encoding multiclass model, end to end: evaluate every tree
    // function out of the assembled module, combine per the class rule, and
    // compare with the reference interpreter.
    let doc = json!({
        "learner": {
            "gradient_booster": {"model": {
                "trees": [
                    {
                        "left_children": [1, -1, -1],
                        "right_children": [2, -1, -1],
                        "split_indices": [0],
                        "split_conditions": [0.5],
                        "base_weights": [0.0, 0.4, -0.4],
                    },
                    {"nodeid": 0, "split_index": 1, "split_condition": -1.25,
                     "yes": 1, "no": 2, "missing": 2,
                     "children": [{"nodeid": 1, "leaf": 0.7},
                                  {"nodeid": 2, "leaf": -0.7}]},
                    {"nodes": [
                        {"nodeid": 0, "split_index": 2, "split_condition": 3.5,
                         "yes": 1, "no": 2},
                        {"nodeid": 1, "leaf": 1.1},
                        {"nodeid": 2, "leaf": -1.1},
                    ]},
                    {"nodeid": 0, "leaf": 0.05},
                    {"nodeid": 0, "leaf": -0.05},
                    {"nodeid": 0, "leaf": 0.25},
                ],
                "tree_info": [0, 1, 2, 0, 1, 2],
            }},
            "learner_model_param": {"num_class": "3"},
        }
    });

    let compiled = compile(&doc).unwrap();
    let (forest, _) = parse_forest(&doc, &CompileOptions::default()).unwrap();

    let tree_fns: Vec<String> = (0..compiled.n_trees)
        .map(|i| extract_tree_fn(&compiled.source, i))
        .collect();

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..50 {
        let features = random_features(&mut rng, 3, 0.1);

        let mut logits = vec![0.0f64; compiled.n_classes as usize];
        for (i, tree_fn) in tree_fns.iter().enumerate() {
            logits[forest.class_of(i) as usize] += eval_tree_fn(tree_fn, &features);
        }

        // Logit accumulation is order-identical, so bits must match.
        let reference = forest.predict_row(&features);
        for (a, b) in logits.iter().zip(reference.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }

        let mut probs = logits;
        softmax_inplace(&mut probs);
        let reference_probs = forest.predict_proba(&features);
        for (a, b) in probs.iter().zip(reference_probs.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}

// =============================================================================
// Softmax invariants
// =============================================================================

proptest! {
    #[test]
    fn softmax_outputs_form_a_distribution(
        logits in prop::collection::vec(-1e6f64..1e6f64, 1..8)
    ) {
        let mut probs = logits.clone();
        softmax_inplace(&mut probs);

        for &p in &probs {
            prop_assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
        }
        let sum: f64 = probs.iter().sum();
        prop_assert!((sum - 1.0).abs() <= 1e-9, "sum {sum} not within 1e-9 of 1");
    }

    #[test]
    fn softmax_is_shift_invariant(
        logits in prop::collection::vec(-1e3f64..1e3f64, 1..8),
        shift in -1e3f64..1e3f64,
    ) {
        let mut base = logits.clone();
        softmax_inplace(&mut base);

        let mut shifted: Vec<f64> = logits.iter().map(|x| x + shift).collect();
        softmax_inplace(&mut shifted);

        for (a, b) in base.iter().zip(shifted.iter()) {
            prop_assert!((a - b).abs() <= 1e-9, "{a} vs {b} after shift {shift}");
        }
    }

    #[test]
    fn literal_formatting_round_trips(value in prop::num::f64::ANY) {
        prop_assume!(value.is_finite());
        let text = timber::emit::format_f64(value);
        let back: f64 = text.parse().unwrap();
        prop_assert_eq!(back.to_bits(), value.to_bits());
    }
}
