//! Clamped sigmoid and logarithm.
//!
//! `exp(-x)` overflows for very negative `x`, and `ln(0)` is `-inf`. Both
//! primitives clamp those regimes to exactly zero so that no non-finite value
//! enters the forward pass or the loss.

use ndarray::{Array, ArrayBase, Data, Dimension};

/// Excitations at or below this value produce a sigmoid activation of 0.
pub const SIGMOID_CUTOFF: f64 = -100.0;

/// `exp(-100)`. Arguments at or below this value have a safe log of 0.
pub const SAFE_LOG_MIN: f64 = 3.720_075_976_020_836e-44;

/// Logistic sigmoid, returning 0 for `x <= -100`.
///
/// # Example
///
/// ```
/// use rpn_models::safe_sigmoid;
///
/// assert!((safe_sigmoid(0.0) - 0.5).abs() < 1e-12);
/// assert_eq!(safe_sigmoid(-100.0), 0.0);
/// ```
#[must_use]
pub fn safe_sigmoid(x: f64) -> f64 {
    if x > SIGMOID_CUTOFF {
        1.0 / (1.0 + (-x).exp())
    } else {
        0.0
    }
}

/// Natural logarithm, returning 0 for `x <= exp(-100)`.
///
/// The clamp is deliberately non-mathematical: callers accept that inputs
/// this close to zero contribute nothing instead of `-inf`.
#[must_use]
pub fn safe_log(x: f64) -> f64 {
    if x > SAFE_LOG_MIN { x.ln() } else { 0.0 }
}

/// Elementwise [`safe_sigmoid`].
#[must_use]
pub fn safe_sigmoid_array<S, D>(x: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    x.mapv(safe_sigmoid)
}

/// Elementwise [`safe_log`].
#[must_use]
pub fn safe_log_array<S, D>(x: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    x.mapv(safe_log)
}
