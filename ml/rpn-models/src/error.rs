//! Error types for rpn-models crate.

use rpn_types::TypesError;
use thiserror::Error;

/// Errors that can occur in rpn-models operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Tensor dimensions disagree with the network contract.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Tensor or operation being checked.
        context: String,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// Argument outside its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A reshape could not be applied to the tensor layout.
    #[error("tensor layout error: {0}")]
    Layout(String),
}

impl ModelError {
    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Creates a layout error.
    #[must_use]
    pub fn layout(reason: impl Into<String>) -> Self {
        Self::Layout(reason.into())
    }
}

impl From<TypesError> for ModelError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::ShapeMismatch {
                context,
                expected,
                actual,
            } => Self::ShapeMismatch {
                context,
                expected,
                actual,
            },
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}

impl From<ndarray::ShapeError> for ModelError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Layout(err.to_string())
    }
}

/// Result type for rpn-models operations.
pub type Result<T> = std::result::Result<T, ModelError>;
