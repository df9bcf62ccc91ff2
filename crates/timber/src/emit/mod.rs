//! Source-code emission for compiled scoring modules.
//!
//! `literal` owns numeric formatting, `tree` compiles one canonical tree
//! into a scoring function, and `module` assembles the final standalone ES
//! module around the per-tree functions.

pub mod literal;
pub mod module;
pub mod tree;

pub use literal::format_f64;
pub use module::emit_module;
pub use tree::{emit_tree, stub_function};
