//! Error types for detdecode.

use thiserror::Error;

/// Result alias for detdecode operations.
pub type DetDecodeResult<T> = std::result::Result<T, DetDecodeError>;

/// Errors that can occur when building or running a detection pipeline.
///
/// Per-candidate problems (out-of-range class index, degenerate boxes) are not
/// errors; those candidates are dropped and reported as a
/// [`Rejection`](crate::Rejection) on the observer.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DetDecodeError {
    /// The boxes or scores output could not be identified.
    #[error("unresolved output roles: {reason}")]
    UnresolvedOutputRoles { reason: &'static str },
    /// A tensor buffer is shorter than its shape requires.
    #[error("tensor buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A tensor shape cannot be used (overflowing element count).
    #[error("invalid tensor shape: {reason}")]
    InvalidShape { reason: &'static str },
    /// A configuration value is out of range.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// The label resource could not be read.
    #[error("label io error: {reason}")]
    LabelIo { reason: String },
    /// The label resource contained no labels.
    #[error("label table is empty")]
    EmptyLabelTable,
    /// The upstream inference call failed before any tensors were produced.
    #[error("inference failed: {reason}")]
    InferenceFailed { reason: String },
}
