//! Per-cell anchor rectangles.

use ndarray::{Array4, ArrayView4, s};

use crate::error::{Result, TypesError};
use crate::layout::format_shape;
use crate::rect::Rect;

/// Fixed reference rectangles, one per `(n1, n2, a)` cell and anchor slot.
///
/// Stored as an `(N1, N2, NA, 4)` tensor of `(x, y, w, h)`. Construction
/// rejects any anchor with a non-positive width or height, so every anchor
/// held by a grid can be used with [`crate::encode`] and [`crate::decode`].
///
/// # Example
///
/// ```
/// use rpn_types::AnchorGrid;
///
/// let grid = AnchorGrid::from_base_sizes(2, 3, 8.0, &[(8.0, 8.0), (16.0, 8.0)]).unwrap();
/// assert_eq!(grid.dims(), (2, 3, 2));
///
/// let anchor = grid.anchor(1, 2, 1).unwrap();
/// assert_eq!(anchor.as_array(), [12.0, 8.0, 16.0, 8.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorGrid {
    data: Array4<f64>,
}

impl AnchorGrid {
    /// Wraps an `(N1, N2, NA, 4)` anchor tensor.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::ShapeMismatch`] if the last axis is not 4, and
    /// [`TypesError::InvalidAnchor`] for the first anchor whose width or
    /// height is not strictly positive.
    pub fn new(data: Array4<f64>) -> Result<Self> {
        if data.shape()[3] != 4 {
            return Err(TypesError::shape_mismatch(
                "anchors",
                "[N1, N2, NA, 4]",
                format_shape(data.shape()),
            ));
        }

        let (d1, d2, da, _) = data.dim();
        for n1 in 0..d1 {
            for n2 in 0..d2 {
                for a in 0..da {
                    let (width, height) = (data[[n1, n2, a, 2]], data[[n1, n2, a, 3]]);
                    if !Rect::new(0.0, 0.0, width, height).is_valid_anchor() {
                        return Err(TypesError::invalid_anchor(
                            format!("({n1}, {n2}, {a})"),
                            width,
                            height,
                        ));
                    }
                }
            }
        }

        Ok(Self { data })
    }

    /// Builds a grid of `sizes.len()` anchors per cell, each centred on the
    /// cell centre.
    ///
    /// Axis `n1` runs down the image (y) and `n2` across it (x); cell
    /// `(n1, n2)` has centre `((n2 + 0.5) * stride, (n1 + 0.5) * stride)`.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidAnchor`] if any `(w, h)` is not positive,
    /// or [`TypesError::InvalidRect`] if `sizes` is empty or `stride` is not
    /// positive.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_base_sizes(
        n1: usize,
        n2: usize,
        stride: f64,
        sizes: &[(f64, f64)],
    ) -> Result<Self> {
        if sizes.is_empty() {
            return Err(TypesError::invalid_rect("at least one anchor size is required"));
        }
        if !(stride.is_finite() && stride > 0.0) {
            return Err(TypesError::invalid_rect(format!(
                "anchor stride must be > 0, got {stride}"
            )));
        }

        let mut data = Array4::<f64>::zeros((n1, n2, sizes.len(), 4));
        for i in 0..n1 {
            let cy = (i as f64 + 0.5) * stride;
            for j in 0..n2 {
                let cx = (j as f64 + 0.5) * stride;
                for (a, &(w, h)) in sizes.iter().enumerate() {
                    data[[i, j, a, 0]] = cx - w / 2.0;
                    data[[i, j, a, 1]] = cy - h / 2.0;
                    data[[i, j, a, 2]] = w;
                    data[[i, j, a, 3]] = h;
                }
            }
        }

        Self::new(data)
    }

    /// Returns the `(N1, N2, NA)` grid dimensions.
    #[must_use]
    pub fn dims(&self) -> (usize, usize, usize) {
        let (n1, n2, na, _) = self.data.dim();
        (n1, n2, na)
    }

    /// Returns the total number of anchors, `N1 * N2 * NA`.
    #[must_use]
    pub fn len(&self) -> usize {
        let (n1, n2, na) = self.dims();
        n1 * n2 * na
    }

    /// Returns true if the grid holds no anchors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the anchor at `(n1, n2, a)`, or `None` when out of range.
    #[must_use]
    pub fn anchor(&self, n1: usize, n2: usize, a: usize) -> Option<Rect> {
        let (d1, d2, da) = self.dims();
        if n1 >= d1 || n2 >= d2 || a >= da {
            return None;
        }
        let v = self.data.slice(s![n1, n2, a, ..]);
        Some(Rect::new(v[0], v[1], v[2], v[3]))
    }

    /// Borrows the underlying `(N1, N2, NA, 4)` tensor.
    #[must_use]
    pub fn view(&self) -> ArrayView4<'_, f64> {
        self.data.view()
    }

    /// Consumes the grid and returns the tensor.
    #[must_use]
    pub fn into_inner(self) -> Array4<f64> {
        self.data
    }
}
