//! Detection loss for the region proposal network.
//!
//! Targets `Y` share the `(N1, N2, NA, 5)` layout of the network output:
//! channels `0..4` hold the encoded box of the matched ground truth and
//! channel 4 is 1 for a positive anchor and 0 otherwise.

use ndarray::{ArrayView4, Axis, Zip, s};
use rpn_models::safe_log;
use rpn_types::{CLASS_CHANNEL, REGRESSION_CHANNELS, ensure_shape, output_grid};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The two loss components for one image.
///
/// # Example
///
/// ```
/// use rpn_training::DetectionLoss;
///
/// let loss = DetectionLoss::new(0.7, 0.2);
/// assert!((loss.total() - 0.9).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionLoss {
    /// Mean binary cross-entropy over every anchor.
    pub bce: f64,

    /// Half the squared regression error, averaged over positive anchors.
    pub mse: f64,
}

impl DetectionLoss {
    /// Creates a loss record.
    #[must_use]
    pub const fn new(bce: f64, mse: f64) -> Self {
        Self { bce, mse }
    }

    /// Returns `bce + mse`.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.bce + self.mse
    }

    /// Returns true if both components are finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.bce.is_finite() && self.mse.is_finite()
    }
}

/// Validates a prediction/target pair and returns the anchor count.
fn anchor_count(yhat: ArrayView4<'_, f64>, y: ArrayView4<'_, f64>) -> Result<usize> {
    let (n1, n2, na) = output_grid("yhat", yhat.shape())?;
    ensure_shape("y", yhat.shape(), y.shape())?;
    Ok(n1 * n2 * na)
}

/// Sum over anchors of `y log(yhat) + (1 - y) log(1 - yhat)`, using
/// [`safe_log`] on both terms.
fn log_likelihood(yhat: ArrayView4<'_, f64>, y: ArrayView4<'_, f64>) -> f64 {
    Zip::from(y.index_axis(Axis(3), CLASS_CHANNEL))
        .and(yhat.index_axis(Axis(3), CLASS_CHANNEL))
        .fold(0.0, |acc, &t, &p| {
            acc + t * safe_log(p) + (1.0 - t) * safe_log(1.0 - p)
        })
}

/// Squared regression error per anchor, `||Y[0:4] - Yhat[0:4]||^2`.
fn squared_box_error(yhat: ArrayView4<'_, f64>, y: ArrayView4<'_, f64>) -> ndarray::Array3<f64> {
    let diff = &y.slice(s![.., .., .., ..REGRESSION_CHANNELS])
        - &yhat.slice(s![.., .., .., ..REGRESSION_CHANNELS]);
    diff.mapv(|d| d * d).sum_axis(Axis(3))
}

/// Binary cross-entropy of the classification channel, averaged over all
/// `N1 * N2 * NA` anchors.
///
/// # Errors
///
/// Returns [`crate::TrainingError::ShapeMismatch`] if the shapes differ or
/// the last axis is not 5.
#[allow(clippy::cast_precision_loss)]
pub fn classification_loss(yhat: ArrayView4<'_, f64>, y: ArrayView4<'_, f64>) -> Result<f64> {
    let anchors = anchor_count(yhat, y)?;
    if anchors == 0 {
        return Ok(0.0);
    }
    Ok(-log_likelihood(yhat, y) / anchors as f64)
}

/// Regression loss over positive anchors:
/// `0.5 * sum(y4 * ||Y[0:4] - Yhat[0:4]||^2) / sum(y4)`.
///
/// Returns 0 when no anchor is positive.
///
/// # Errors
///
/// Returns [`crate::TrainingError::ShapeMismatch`] if the shapes differ or
/// the last axis is not 5.
pub fn regression_loss(yhat: ArrayView4<'_, f64>, y: ArrayView4<'_, f64>) -> Result<f64> {
    anchor_count(yhat, y)?;
    let labels = y.index_axis(Axis(3), CLASS_CHANNEL);
    let positives = labels.sum();
    if positives <= 0.0 {
        return Ok(0.0);
    }
    let weighted = (&squared_box_error(yhat, y) * &labels).sum();
    Ok(0.5 * weighted / positives)
}

/// Computes both loss components.
///
/// # Errors
///
/// Returns [`crate::TrainingError::ShapeMismatch`] if the shapes differ or
/// the last axis is not 5.
///
/// # Example
///
/// ```
/// use ndarray::Array4;
/// use rpn_training::detection_loss;
///
/// let mut y = Array4::<f64>::zeros((2, 2, 1, 5));
/// y[[0, 0, 0, 4]] = 1.0;
/// let yhat = y.clone();
///
/// let loss = detection_loss(yhat.view(), y.view()).unwrap();
/// assert!(loss.total().abs() < 1e-12);
/// ```
pub fn detection_loss(yhat: ArrayView4<'_, f64>, y: ArrayView4<'_, f64>) -> Result<DetectionLoss> {
    Ok(DetectionLoss::new(
        classification_loss(yhat, y)?,
        regression_loss(yhat, y)?,
    ))
}

/// Un-normalised objective whose gradient with respect to the layer-2
/// excitation is exactly `Yhat - Y`:
///
/// `-sum(y log(yhat) + (1 - y) log(1 - yhat)) + 0.5 * sum(||Y[0:4] - Yhat[0:4]||^2)`
///
/// summed over every anchor, positive or not. This is the function that
/// `backprop` and `weight_gradient` differentiate.
///
/// # Errors
///
/// Returns [`crate::TrainingError::ShapeMismatch`] if the shapes differ or
/// the last axis is not 5.
pub fn summed_objective(yhat: ArrayView4<'_, f64>, y: ArrayView4<'_, f64>) -> Result<f64> {
    anchor_count(yhat, y)?;
    Ok(-log_likelihood(yhat, y) + 0.5 * squared_box_error(yhat, y).sum())
}
