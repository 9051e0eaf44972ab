//! Gradients of the loss with respect to both weight tensors.

use ndarray::{Array3, Array4, Array5, ArrayView3, ArrayView4, s};
use rpn_models::{LAYER1_PADDING, conv_output_extent};
use rpn_types::{NY, ensure_shape, output_grid};
use tracing::debug;

use crate::error::{Result, TrainingError};

/// Zero-pads the two spatial axes of `x` by `padding` on every side.
fn pad_spatial(x: ArrayView3<'_, f64>, padding: usize) -> Array3<f64> {
    let (n1, n2, nc) = x.dim();
    let mut padded = Array3::<f64>::zeros((n1 + 2 * padding, n2 + 2 * padding, nc));
    padded
        .slice_mut(s![padding..padding + n1, padding..padding + n2, ..])
        .assign(&x);
    padded
}

/// Computes `(dW1, dW2)` from the forward activations and the excitation
/// gradients returned by [`crate::backprop`].
///
/// - `dW2[0, 0, d, a, k] = sum_n GradXi2[n, a, k] * H[n, d]`
/// - `dW1[m1, m2, c, d] = sum_n GradXi1[n, d] * X[n + (M - 1 - m) - 1, c]`,
///   summed over positions that fall inside `X`.
///
/// The first-layer formula mirrors the flipped-kernel convolution of the
/// forward pass: for a 3x3 kernel it reads `X[n - (m - 1)]`, so tap
/// `W1[m]` receives the input it multiplied.
///
/// # Errors
///
/// Returns [`TrainingError::ShapeMismatch`] if the activations and
/// gradients do not describe the same network, or if an `m1 x m2` kernel
/// with padding 1 does not map `X` onto the grid of `GradXi1`.
pub fn weight_gradient(
    x: ArrayView3<'_, f64>,
    h: ArrayView3<'_, f64>,
    grad_xi1: ArrayView3<'_, f64>,
    grad_xi2: ArrayView4<'_, f64>,
    m1: usize,
    m2: usize,
) -> Result<(Array4<f64>, Array5<f64>)> {
    let (n1, n2, nc) = x.dim();
    let (o1, o2, nd) = h.dim();
    ensure_shape("grad_xi1", h.shape(), grad_xi1.shape())?;
    let (g1, g2, na) = output_grid("grad_xi2", grad_xi2.shape())?;
    if (g1, g2) != (o1, o2) {
        return Err(TrainingError::shape_mismatch(
            "grad_xi2",
            format!("[{o1}, {o2}, NA, {NY}]"),
            format!("{:?}", grad_xi2.shape()),
        ));
    }
    let extent = conv_output_extent((n1, n2), (m1, m2), LAYER1_PADDING)?;
    if extent != (o1, o2) {
        return Err(TrainingError::shape_mismatch(
            "hidden activations",
            format!("[{}, {}, {nd}]", extent.0, extent.1),
            format!("{:?}", h.shape()),
        ));
    }

    // Second layer: one (nd, cells) x (cells, na * NY) product.
    let h_flat = h.to_shape((o1 * o2, nd))?;
    let g2_flat = grad_xi2.to_shape((o1 * o2, na * NY))?;
    let dw2 = h_flat
        .t()
        .dot(&g2_flat)
        .into_shape_with_order((1, 1, nd, na, NY))?;

    // First layer: for each tap, the window of the padded input that the
    // tap multiplied, contracted against GradXi1 over all cells.
    let padded = pad_spatial(x, LAYER1_PADDING);
    let g1_flat = grad_xi1.to_shape((o1 * o2, nd))?;
    let mut dw1 = Array4::<f64>::zeros((m1, m2, nc, nd));
    for a in 0..m1 {
        for b in 0..m2 {
            let (r0, c0) = (m1 - 1 - a, m2 - 1 - b);
            let window = padded.slice(s![r0..r0 + o1, c0..c0 + o2, ..]);
            let window = window.to_shape((o1 * o2, nc))?;
            dw1.slice_mut(s![a, b, .., ..])
                .assign(&window.t().dot(&g1_flat));
        }
    }

    debug!(m1, m2, nc, nd, na, "computed weight gradients");
    Ok((dw1, dw2))
}
