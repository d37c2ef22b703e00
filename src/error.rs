use thiserror::Error;

/// Errors surfaced when constructing an embedding
///
/// Only structural problems with the input end up here. Numerical edge cases
/// (zero kernel mass, zero axis range, non-converging bandwidth search) are
/// handled in place via floors and clamps.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TsneError {
    /// The distance source reports fewer than two items
    #[error("t-SNE needs at least 2 items, got {n}")]
    TooFewItems { n: usize },

    /// An explicit distance matrix is not square
    #[error("distance matrix must be square, got {n_rows} x {n_cols}")]
    NonSquareMatrix { n_rows: usize, n_cols: usize },

    /// Item vectors handed to a vector-based source differ in length
    #[error("item {index} has {got} features, expected {expected}")]
    RaggedInput {
        index: usize,
        expected: usize,
        got: usize,
    },

    /// A pairwise distance is negative, NaN or infinite
    #[error("invalid distance {value} between items {i} and {j}")]
    InvalidDistance { i: usize, j: usize, value: f64 },

    /// A distance source reports a non-zero distance of an item to itself
    #[error("item {i} has non-zero self-distance {value}")]
    NonZeroSelfDistance { i: usize, value: f64 },

    /// A distance source reports different values for `(i, j)` and `(j, i)`
    #[error("distance between items {i} and {j} is asymmetric: {forward} vs {backward}")]
    AsymmetricDistance {
        i: usize,
        j: usize,
        forward: f64,
        backward: f64,
    },

    /// The metadata does not have one entry per item
    #[error("got {got} metadata entries for {expected} items")]
    MetaLengthMismatch { expected: usize, got: usize },

    /// A hyperparameter is out of its valid range
    #[error("invalid value for parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Result alias used throughout the crate
pub type Result<T, E = TsneError> = std::result::Result<T, E>;
