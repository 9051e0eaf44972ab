//! Output channel layout and shape checks shared by every crate.

use crate::error::{Result, TypesError};

/// Channels per anchor in network outputs and targets.
pub const NY: usize = 5;

/// Number of regression channels (`0..4`).
pub const REGRESSION_CHANNELS: usize = 4;

/// Index of the classification channel.
pub const CLASS_CHANNEL: usize = 4;

/// Formats a shape as `[d0, d1, ...]`.
#[must_use]
pub fn format_shape(shape: &[usize]) -> String {
    format!("{shape:?}")
}

/// Fails with [`TypesError::ShapeMismatch`] unless `actual == expected`.
///
/// # Errors
///
/// Returns an error naming `context` when the shapes differ.
pub fn ensure_shape(context: &str, expected: &[usize], actual: &[usize]) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(TypesError::shape_mismatch(
            context,
            format_shape(expected),
            format_shape(actual),
        ))
    }
}

/// Checks that a `(N1, N2, NA, NY)` tensor carries [`NY`] channels and
/// returns its `(N1, N2, NA)` grid.
///
/// # Errors
///
/// Returns an error if `shape` is not rank 4 or its last axis is not [`NY`].
pub fn output_grid(context: &str, shape: &[usize]) -> Result<(usize, usize, usize)> {
    match *shape {
        [n1, n2, na, ny] if ny == NY => Ok((n1, n2, na)),
        _ => Err(TypesError::shape_mismatch(
            context,
            format!("[N1, N2, NA, {NY}]"),
            format_shape(shape),
        )),
    }
}
