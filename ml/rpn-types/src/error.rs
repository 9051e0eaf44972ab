//! Error types for rpn-types crate.

use thiserror::Error;

/// Errors that can occur in rpn-types operations.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Anchor with a non-positive (or non-finite) width or height.
    #[error("invalid anchor at {location}: width {width}, height {height} must be > 0")]
    InvalidAnchor {
        /// Where the anchor was found, e.g. `(n1, n2, a)`.
        location: String,
        /// Anchor width.
        width: f64,
        /// Anchor height.
        height: f64,
    },

    /// Invalid rectangle.
    #[error("invalid rectangle: {0}")]
    InvalidRect(String),

    /// Tensor dimensions disagree with the expected layout.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Tensor or operation being checked.
        context: String,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },
}

impl TypesError {
    /// Creates an invalid anchor error.
    #[must_use]
    pub fn invalid_anchor(location: impl Into<String>, width: f64, height: f64) -> Self {
        Self::InvalidAnchor {
            location: location.into(),
            width,
            height,
        }
    }

    /// Creates an invalid rectangle error.
    #[must_use]
    pub fn invalid_rect(reason: impl Into<String>) -> Self {
        Self::InvalidRect(reason.into())
    }

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
}

/// Result type for rpn-types operations.
pub type Result<T> = std::result::Result<T, TypesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_anchor() {
        let err = TypesError::invalid_anchor("(0, 1, 2)", 0.0, 4.0);
        let msg = err.to_string();
        assert!(msg.contains("(0, 1, 2)"));
        assert!(msg.contains("width 0"));
    }

    #[test]
    fn error_invalid_rect() {
        let err = TypesError::invalid_rect("expected 4 coordinates");
        assert!(err.to_string().contains("invalid rectangle"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = TypesError::shape_mismatch("anchors", "[8, 8, 9, 4]", "[8, 8, 9, 5]");
        let msg = err.to_string();
        assert!(msg.contains("anchors"));
        assert!(msg.contains("[8, 8, 9, 4]"));
        assert!(msg.contains("[8, 8, 9, 5]"));
    }
}
