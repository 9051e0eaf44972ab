//! Forward propagation of the two-layer region proposal network.

use ndarray::{Array3, Array4, ArrayView3, ArrayView4, ArrayView5, Axis};
use rpn_types::{CLASS_CHANNEL, NY, format_shape};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conv::{conv_layer, conv_output_extent};
use crate::error::{ModelError, Result};
use crate::numeric::safe_sigmoid;

/// Zero padding applied by the first (convolutional) layer.
pub const LAYER1_PADDING: usize = 1;

/// Dimensions of one network instance, validated against each other.
///
/// | Tensor | Shape |
/// |---|---|
/// | `X` | `(n1, n2, nc)` |
/// | `W1` | `(m1, m2, nc, nd)` |
/// | `W2` | `(1, 1, nd, na, NY)` |
/// | `H` | `(o1, o2, nd)` |
/// | `Yhat` | `(o1, o2, na, NY)` |
///
/// With the usual 3x3 kernel, `(o1, o2) == (n1, n2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkShape {
    /// Input rows.
    pub n1: usize,
    /// Input columns.
    pub n2: usize,
    /// Input channels.
    pub nc: usize,
    /// Kernel rows.
    pub m1: usize,
    /// Kernel columns.
    pub m2: usize,
    /// Hidden channels.
    pub nd: usize,
    /// Anchors per cell.
    pub na: usize,
    /// Hidden and output rows.
    pub o1: usize,
    /// Hidden and output columns.
    pub o2: usize,
}

impl NetworkShape {
    /// Infers and cross-checks the shape from an input and both weight tensors.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ShapeMismatch`] if the channel counts disagree,
    /// `W2` is not `(1, 1, nd, na, 5)`, or the kernel does not fit the input.
    pub fn infer(
        x: ArrayView3<'_, f64>,
        w1: ArrayView4<'_, f64>,
        w2: ArrayView5<'_, f64>,
    ) -> Result<Self> {
        let (n1, n2, nc) = x.dim();
        let (m1, m2, w1c, nd) = w1.dim();
        if w1c != nc {
            return Err(ModelError::shape_mismatch(
                "w1",
                format!("[{m1}, {m2}, {nc}, {nd}]"),
                format_shape(w1.shape()),
            ));
        }

        let (one_a, one_b, w2d, na, ny) = w2.dim();
        if one_a != 1 || one_b != 1 || w2d != nd || ny != NY {
            return Err(ModelError::shape_mismatch(
                "w2",
                format!("[1, 1, {nd}, NA, {NY}]"),
                format_shape(w2.shape()),
            ));
        }

        let (o1, o2) = conv_output_extent((n1, n2), (m1, m2), LAYER1_PADDING)?;

        Ok(Self {
            n1,
            n2,
            nc,
            m1,
            m2,
            nd,
            na,
            o1,
            o2,
        })
    }

    /// Shape of the hidden activations `(o1, o2, nd)`.
    #[must_use]
    pub const fn hidden_dim(&self) -> (usize, usize, usize) {
        (self.o1, self.o2, self.nd)
    }

    /// Shape of the network output `(o1, o2, na, NY)`.
    #[must_use]
    pub const fn output_dim(&self) -> (usize, usize, usize, usize) {
        (self.o1, self.o2, self.na, NY)
    }

    /// Shape of the first-layer weights `(m1, m2, nc, nd)`.
    #[must_use]
    pub const fn w1_dim(&self) -> (usize, usize, usize, usize) {
        (self.m1, self.m2, self.nc, self.nd)
    }

    /// Shape of the second-layer weights `(1, 1, nd, na, NY)`.
    #[must_use]
    pub const fn w2_dim(&self) -> (usize, usize, usize, usize, usize) {
        (1, 1, self.nd, self.na, NY)
    }
}

/// Per-cell, per-anchor dense projection (a 1x1 convolution).
///
/// `Xi2[n1, n2, a, k] = sum_d H[n1, n2, d] * W2[0, 0, d, a, k]`, computed as
/// one `(cells, nd) x (nd, na * ny)` matrix product.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] if `W2` is not `(1, 1, nd, na, ny)`
/// for the hidden channel count `nd` of `h`.
pub fn dense_projection(h: ArrayView3<'_, f64>, w2: ArrayView5<'_, f64>) -> Result<Array4<f64>> {
    let (o1, o2, nd) = h.dim();
    let (one_a, one_b, w2d, na, ny) = w2.dim();
    if one_a != 1 || one_b != 1 || w2d != nd {
        return Err(ModelError::shape_mismatch(
            "w2",
            format!("[1, 1, {nd}, NA, NY]"),
            format_shape(w2.shape()),
        ));
    }

    let h_flat = h.to_shape((o1 * o2, nd))?;
    let w_flat = w2.to_shape((nd, na * ny))?;
    let xi = h_flat.dot(&w_flat);
    Ok(xi.into_shape_with_order((o1, o2, na, ny))?)
}

/// Runs the network on one input.
///
/// 1. `Xi1 = conv_layer(X, W1, padding = 1)`
/// 2. `H = max(0, Xi1)`
/// 3. `Xi2 = dense_projection(H, W2)`
/// 4. `Yhat[..., 4] = safe_sigmoid(Xi2[..., 4])`; channels `0..4` are left raw.
///
/// Returns `(H, Yhat)`.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] if the tensors are inconsistent
/// (see [`NetworkShape::infer`]).
///
/// # Example
///
/// ```
/// use ndarray::{Array3, Array4, Array5};
/// use rpn_models::forwardprop;
///
/// let x = Array3::<f64>::ones((4, 4, 2));
/// let w1 = Array4::<f64>::from_elem((3, 3, 2, 3), 0.1);
/// let w2 = Array5::<f64>::zeros((1, 1, 3, 2, 5));
///
/// let (hidden, yhat) = forwardprop(x.view(), w1.view(), w2.view()).unwrap();
/// assert_eq!(hidden.dim(), (4, 4, 3));
/// assert_eq!(yhat.dim(), (4, 4, 2, 5));
/// // Zero second-layer weights give a score of sigmoid(0) everywhere.
/// assert!((yhat[[0, 0, 0, 4]] - 0.5).abs() < 1e-12);
/// ```
pub fn forwardprop(
    x: ArrayView3<'_, f64>,
    w1: ArrayView4<'_, f64>,
    w2: ArrayView5<'_, f64>,
) -> Result<(Array3<f64>, Array4<f64>)> {
    let shape = NetworkShape::infer(x, w1, w2)?;
    debug!(?shape, "forward pass");

    let hidden = conv_layer(x, w1, LAYER1_PADDING)?.mapv_into(|v| v.max(0.0));

    let mut yhat = dense_projection(hidden.view(), w2)?;
    yhat.index_axis_mut(Axis(3), CLASS_CHANNEL)
        .mapv_inplace(safe_sigmoid);

    Ok((hidden, yhat))
}
