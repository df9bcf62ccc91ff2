//! timber: a decision-forest model compiler.
//!
//! Ingests a serialized gradient-boosted-tree ensemble whose JSON encoding
//! is only loosely specified (three incompatible variants show up in the
//! wild), normalizes it into one canonical forest representation, and
//! compiles that into a self-contained JavaScript scoring module that
//! reproduces the ensemble's numeric output exactly: no training library,
//! no JSON parsing, no runtime dependency on this crate.
//!
//! # Key Types
//!
//! - [`compile`] / [`compile_with_options`] / [`compile_str`] - One-call compilation
//! - [`CompileOptions`] - Feature-name table, parallelism
//! - [`Compiled`] - Emitted module source plus a diagnostic report
//! - [`Forest`] / [`Tree`] - Canonical in-memory representation with a
//!   reference interpreter (`predict_proba` / `score_row`)
//!
//! # Example
//!
//! ```
//! let model = serde_json::json!({
//!     "learner": {
//!         "gradient_booster": {"model": {"trees": [
//!             {"nodeid": 0, "split_index": 0, "split_condition": 0.5,
//!              "yes": 1, "no": 2,
//!              "children": [{"nodeid": 1, "leaf": 1.0},
//!                           {"nodeid": 2, "leaf": -1.0}]}
//!         ]}},
//!         "learner_model_param": {"num_class": "1"},
//!     }
//! });
//!
//! let compiled = timber::compile(&model).unwrap();
//! assert!(compiled.source.contains("export function predict(f)"));
//! ```
//!
//! Malformed trees never abort a compile: they degrade to constant-zero
//! stubs and are listed in [`Compiled::report`]. Only a document with no
//! trees at all (or a feature reference that cannot be mapped to an index)
//! is a hard error.

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod compat;
pub mod compiler;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod repr;
pub mod transform;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Compilation entry points
pub use compiler::{compile, compile_str, compile_with_options, parse_forest};
pub use compiler::{CompileOptions, Compiled};

// Errors and diagnostics
pub use diagnostics::{Diagnostic, DiagnosticReport};
pub use error::CompileError;

// Canonical representation
pub use compat::{normalize_tree, FeatureResolver, TreeSchema};
pub use repr::{ClassAssignment, Forest, NodeId, Tree, TreeBuilder};

// Shared utilities
pub use utils::Parallelism;
