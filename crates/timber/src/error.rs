//! Fatal compilation errors.

/// Errors that abort a compilation run.
///
/// Almost everything wrong with an input model degrades to a
/// [`Diagnostic`](crate::diagnostics::Diagnostic) instead; only the absence
/// of any trees (nothing meaningful to emit) and an unmappable feature
/// reference (would silently score against the wrong feature) are fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The input text is not valid JSON (only reachable through
    /// `compile_str`; callers handing over a parsed document never see it).
    #[error("input is not valid JSON: {0}")]
    InvalidJson(String),

    /// The input document contains no trees list at any known location.
    #[error("input document contains no trees list")]
    MissingTreeList,

    /// A split references a feature by a name or value that cannot be
    /// mapped to a feature-vector index. Supply the model's feature names
    /// via `CompileOptions::feature_names` to resolve names.
    #[error("tree {tree_index} references feature {name:?} which cannot be mapped to an index")]
    UnresolvableFeature { tree_index: usize, name: String },
}
