//! Canonical forest representation (ordered trees + class assignment).

use super::tree::TreeValidationError;
use super::Tree;
use crate::transform::softmax_inplace;

/// How trees map onto output classes.
///
/// Multiclass boosters either record the class of every tree explicitly or
/// rely on the round-robin convention of emitting one tree per class per
/// boosting round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassAssignment {
    /// Per-tree class indices; length equals the number of trees.
    Explicit(Vec<u32>),
    /// Tree at position `i` belongs to class `i % n_classes`.
    RoundRobin,
}

impl ClassAssignment {
    /// Class of the tree at `tree_idx`. Total for any index.
    #[inline]
    pub fn class_of(&self, tree_idx: usize, n_classes: u32) -> u32 {
        match self {
            ClassAssignment::Explicit(classes) => {
                classes.get(tree_idx).copied().unwrap_or(0) % n_classes.max(1)
            }
            ClassAssignment::RoundRobin => (tree_idx as u32) % n_classes.max(1),
        }
    }
}

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForestValidationError {
    /// Explicit class list length differs from the tree count.
    ClassListLenMismatch { n_trees: usize, len: usize },
    /// An explicit class index is outside `0..n_classes`.
    ClassOutOfRange {
        tree_idx: usize,
        class: u32,
        n_classes: u32,
    },
    /// A tree failed structural validation.
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
}

impl std::fmt::Display for ForestValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClassListLenMismatch { n_trees, len } => write!(
                f,
                "class list has {len} entries but the forest has {n_trees} trees"
            ),
            Self::ClassOutOfRange {
                tree_idx,
                class,
                n_classes,
            } => write!(
                f,
                "tree {tree_idx} is assigned class {class} but the forest has {n_classes} classes"
            ),
            Self::InvalidTree { tree_idx, error } => {
                write!(f, "tree {tree_idx} is invalid: {error}")
            }
        }
    }
}

impl std::error::Error for ForestValidationError {}

/// Ordered forest of canonical trees.
///
/// Tree order is significant and preserved from the source document: it
/// drives class assignment under the round-robin rule and fixes the
/// floating-point summation order of the emitted module. Built once per
/// compilation and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    n_classes: u32,
    assignment: ClassAssignment,
}

impl Forest {
    /// Create an empty forest with the given class count (min 1) using the
    /// round-robin assignment.
    pub fn new(n_classes: u32) -> Self {
        Self {
            trees: Vec::new(),
            n_classes: n_classes.max(1),
            assignment: ClassAssignment::RoundRobin,
        }
    }

    /// Replace the class assignment.
    pub fn with_assignment(mut self, assignment: ClassAssignment) -> Self {
        self.assignment = assignment;
        self
    }

    /// Append a tree; forest order is append order.
    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of output classes (always >= 1).
    #[inline]
    pub fn n_classes(&self) -> u32 {
        self.n_classes
    }

    /// The class assignment rule.
    #[inline]
    pub fn assignment(&self) -> &ClassAssignment {
        &self.assignment
    }

    /// Class of the tree at `tree_idx`.
    #[inline]
    pub fn class_of(&self, tree_idx: usize) -> u32 {
        self.assignment.class_of(tree_idx, self.n_classes)
    }

    /// Get a reference to a specific tree.
    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        &self.trees[idx]
    }

    /// Iterate over trees in forest order.
    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Iterate over trees with their class assignments.
    pub fn trees_with_classes(&self) -> impl Iterator<Item = (&Tree, u32)> {
        self.trees
            .iter()
            .enumerate()
            .map(|(i, t)| (t, self.class_of(i)))
    }

    /// Reference prediction: per-class logits for a single feature row.
    ///
    /// Trees are accumulated in forest order, which is what the emitted
    /// module does; floating-point summation is not associative, so the two
    /// must share an order to agree exactly.
    pub fn predict_row(&self, features: &[f64]) -> Vec<f64> {
        let mut logits = vec![0.0f64; self.n_classes as usize];
        for (tree, class) in self.trees_with_classes() {
            logits[class as usize] += tree.score_row(features);
        }
        logits
    }

    /// Reference prediction: softmax probabilities for a single feature row.
    ///
    /// Softmax is applied for every class count, so a one-class forest
    /// always yields `[1.0]`.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut logits = self.predict_row(features);
        softmax_inplace(&mut logits);
        logits
    }

    /// Validate structural invariants for this forest.
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        if let ClassAssignment::Explicit(classes) = &self.assignment {
            if classes.len() != self.trees.len() {
                return Err(ForestValidationError::ClassListLenMismatch {
                    n_trees: self.trees.len(),
                    len: classes.len(),
                });
            }
            for (i, &c) in classes.iter().enumerate() {
                if c >= self.n_classes {
                    return Err(ForestValidationError::ClassOutOfRange {
                        tree_idx: i,
                        class: c,
                        n_classes: self.n_classes,
                    });
                }
            }
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|e| ForestValidationError::InvalidTree {
                    tree_idx: i,
                    error: e,
                })?;
        }

        Ok(())
    }
}
