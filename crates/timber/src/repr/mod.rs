//! Canonical decision-forest representations.

/// Canonical node identifier.
///
/// Internally this is just an index into the tree's SoA arrays. The
/// normalizer remaps whatever node ids the source encoding used onto dense
/// indices, with the root always at index 0.
pub type NodeId = u32;

pub mod forest;
pub mod tree;

pub use forest::{ClassAssignment, Forest, ForestValidationError};
pub use tree::{Tree, TreeBuilder, TreeValidationError};
