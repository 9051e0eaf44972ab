//! Back-propagation of the loss gradient to both excitations.

use ndarray::{Array3, Array4, ArrayView3, ArrayView4, ArrayView5, Zip};
use rpn_types::{NY, ensure_shape, format_shape, output_grid};
use tracing::debug;

use crate::error::{Result, TrainingError};

/// Computes the loss gradient with respect to both excitations.
///
/// - `GradXi2 = Yhat - Y`, shape `(N1, N2, NA, 5)`. This is the exact
///   gradient of [`crate::summed_objective`]: sigmoid plus cross-entropy on
///   the classification channel, `0.5 * ||.||^2` on the regression channels.
/// - `GradXi1[n, d] = sum_{a,k} GradXi2[n, a, k] * W2[0, 0, d, a, k]`, kept
///   only where `H[n, d] > 0` (the ReLU derivative).
///
/// Returns `(GradXi1, GradXi2)`.
///
/// # Errors
///
/// Returns [`TrainingError::ShapeMismatch`] if `y`, `yhat`, `h` and `w2`
/// do not describe the same network.
pub fn backprop(
    y: ArrayView4<'_, f64>,
    yhat: ArrayView4<'_, f64>,
    h: ArrayView3<'_, f64>,
    w2: ArrayView5<'_, f64>,
) -> Result<(Array3<f64>, Array4<f64>)> {
    let (o1, o2, na) = output_grid("yhat", yhat.shape())?;
    ensure_shape("y", yhat.shape(), y.shape())?;
    let (h1, h2, nd) = h.dim();
    if (h1, h2) != (o1, o2) {
        return Err(TrainingError::shape_mismatch(
            "hidden activations",
            format!("[{o1}, {o2}, ND]"),
            format_shape(h.shape()),
        ));
    }
    ensure_shape("w2", &[1, 1, nd, na, NY], w2.shape())?;

    let grad_xi2 = &yhat - &y;

    let g_flat = grad_xi2.to_shape((o1 * o2, na * NY))?;
    let w_flat = w2.to_shape((nd, na * NY))?;
    let mut grad_xi1 = g_flat.dot(&w_flat.t()).into_shape_with_order((o1, o2, nd))?;

    Zip::from(&mut grad_xi1).and(&h).for_each(|g, &hv| {
        if hv.is_nan() || hv <= 0.0 {
            *g = 0.0;
        }
    });

    debug!(cells = o1 * o2, nd, na, "back-propagated excitation gradients");
    Ok((grad_xi1, grad_xi2))
}
