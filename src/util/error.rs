//! Error types for blazepost.

use thiserror::Error;

/// Result alias for blazepost operations.
pub type BlazePostResult<T> = std::result::Result<T, BlazePostError>;

/// Errors that can occur while post-processing detector outputs.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BlazePostError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A configuration field is out of range.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    /// A tensor does not have the expected number of dimensions.
    #[error("{tensor} tensor must have {expected} dimensions, got {got}")]
    RankMismatch {
        tensor: &'static str,
        expected: usize,
        got: usize,
    },
    /// A tensor does not have the expected shape.
    #[error("{tensor} tensor has shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        tensor: &'static str,
        expected: [usize; 3],
        got: [usize; 3],
    },
    /// Box and score tensors disagree on the batch size.
    #[error("batch size mismatch: boxes have {boxes} images, scores have {scores}")]
    BatchMismatch { boxes: usize, scores: usize },
    /// The provided buffer length does not match the requested shape.
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    BufferLengthMismatch { expected: usize, got: usize },
    /// The anchor table is malformed.
    #[error("invalid anchor table: {reason}")]
    AnchorTable { reason: String },
    /// A tensor contains a value the pipeline cannot process.
    #[error("non-finite value in {tensor} tensor at flat index {index}")]
    NonFiniteInput { tensor: &'static str, index: usize },
    /// Reading an input file failed.
    #[error("i/o error: {reason}")]
    Io { reason: String },
    /// An internal consistency check failed.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(&'static str),
}
