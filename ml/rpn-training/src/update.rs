//! Plain gradient-descent step.

use ndarray::{Array4, Array5, ArrayView4, ArrayView5};
use rpn_types::ensure_shape;

use crate::error::{Result, TrainingError};

/// Returns `(W1 - lr * dW1, W2 - lr * dW2)` as freshly allocated tensors.
///
/// A learning rate of 0 returns copies of the inputs.
///
/// # Errors
///
/// - [`TrainingError::InvalidConfig`] if `learning_rate` is negative or not
///   finite.
/// - [`TrainingError::ShapeMismatch`] if a gradient does not match its
///   weight tensor.
///
/// # Example
///
/// ```
/// use ndarray::{Array4, Array5};
/// use rpn_training::weight_update;
///
/// let w1 = Array4::<f64>::ones((3, 3, 1, 2));
/// let w2 = Array5::<f64>::ones((1, 1, 2, 1, 5));
/// let dw1 = Array4::<f64>::from_elem((3, 3, 1, 2), 2.0);
/// let dw2 = Array5::<f64>::from_elem((1, 1, 2, 1, 5), -1.0);
///
/// let (new_w1, new_w2) =
///     weight_update(w1.view(), w2.view(), dw1.view(), dw2.view(), 0.25).unwrap();
/// assert!((new_w1[[0, 0, 0, 0]] - 0.5).abs() < 1e-12);
/// assert!((new_w2[[0, 0, 0, 0, 0]] - 1.25).abs() < 1e-12);
/// ```
pub fn weight_update(
    w1: ArrayView4<'_, f64>,
    w2: ArrayView5<'_, f64>,
    dw1: ArrayView4<'_, f64>,
    dw2: ArrayView5<'_, f64>,
    learning_rate: f64,
) -> Result<(Array4<f64>, Array5<f64>)> {
    if !learning_rate.is_finite() || learning_rate < 0.0 {
        return Err(TrainingError::invalid_config(format!(
            "learning rate must be finite and >= 0, got {learning_rate}"
        )));
    }
    ensure_shape("dw1", w1.shape(), dw1.shape())?;
    ensure_shape("dw2", w2.shape(), dw2.shape())?;

    let mut new_w1 = w1.to_owned();
    new_w1.scaled_add(-learning_rate, &dw1);
    let mut new_w2 = w2.to_owned();
    new_w2.scaled_add(-learning_rate, &dw2);

    Ok((new_w1, new_w2))
}
