//! Common utilities used across the crate.

use rayon::prelude::*;

/// Whether parallel execution is allowed.
///
/// Per-tree normalization and code emission are independent, so the compiler
/// may fan them out across a rayon pool. Components don't manage thread
/// pools; they just respect this flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if the rayon pool has multiple threads)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map `f` over `items`, preserving input order in the output.
    ///
    /// The parallel path uses an indexed rayon iterator, so results come back
    /// in the same order regardless of scheduling.
    pub fn maybe_par_map<T, R, F>(self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        match self {
            Parallelism::Sequential => items.into_iter().map(f).collect(),
            Parallelism::Parallel => items.into_par_iter().map(f).collect(),
        }
    }
}
