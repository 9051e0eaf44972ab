//! Error types for rpn-training crate.

use rpn_models::ModelError;
use rpn_types::TypesError;
use thiserror::Error;

/// Errors that can occur during training.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Targets, activations, gradients or weights disagree in shape.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Tensor or operation being checked.
        context: String,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// Invalid training configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Numerical instability detected.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// Model error.
    #[error("model error: {0}")]
    Model(String),

    /// A reshape could not be applied to the tensor layout.
    #[error("tensor layout error: {0}")]
    Layout(String),
}

impl TrainingError {
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

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a numerical instability error.
    #[must_use]
    pub fn numerical_instability(reason: impl Into<String>) -> Self {
        Self::NumericalInstability(reason.into())
    }

    /// Creates a model error.
    #[must_use]
    pub fn model(reason: impl Into<String>) -> Self {
        Self::Model(reason.into())
    }
}

impl From<ModelError> for TrainingError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::ShapeMismatch {
                context,
                expected,
                actual,
            } => Self::ShapeMismatch {
                context,
                expected,
                actual,
            },
            other => Self::Model(other.to_string()),
        }
    }
}

impl From<TypesError> for TrainingError {
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
            other => Self::Model(other.to_string()),
        }
    }
}

impl From<ndarray::ShapeError> for TrainingError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Layout(err.to_string())
    }
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;
