//! Single-image training steps.

use ndarray::{Array4, Array5, ArrayView3, ArrayView4, ArrayView5, Dimension};
use rpn_models::{Detection, detect, forwardprop};
use rpn_types::AnchorGrid;
use tracing::{debug, warn};

use crate::backprop::backprop;
use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::loss::detection_loss;
use crate::metrics::{StepMetrics, TrainingMetrics};
use crate::update::weight_update;
use crate::weight_grad::weight_gradient;

/// Updated weights and metrics from one [`Trainer::train_step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// First-layer weights after the update.
    pub w1: Array4<f64>,
    /// Second-layer weights after the update.
    pub w2: Array5<f64>,
    /// Metrics recorded for the step.
    pub metrics: StepMetrics,
}

fn frobenius_norm<D: Dimension>(a: &ndarray::Array<f64, D>) -> f64 {
    a.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Runs gradient-descent steps, one image at a time.
///
/// Each step runs the forward pass, evaluates the loss, back-propagates,
/// computes both weight gradients and applies the update with the scheduled
/// learning rate. Weights are passed in and returned by value, so the caller
/// owns them between steps.
///
/// # Example
///
/// ```
/// use ndarray::{Array3, Array4, Array5};
/// use rpn_training::{Trainer, TrainingConfig};
///
/// let mut trainer = Trainer::new(TrainingConfig::new(0.01)).unwrap();
///
/// let x = Array3::<f64>::from_elem((4, 4, 1), 0.5);
/// let y = Array4::<f64>::zeros((4, 4, 2, 5));
/// let w1 = Array4::<f64>::from_elem((3, 3, 1, 2), 0.1);
/// let w2 = Array5::<f64>::from_elem((1, 1, 2, 2, 5), 0.1);
///
/// let out = trainer.train_step(x.view(), y.view(), w1.view(), w2.view()).unwrap();
/// assert_eq!(out.w1.dim(), w1.dim());
/// assert_eq!(trainer.step(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
    step: usize,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Creates a trainer.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] if the config is invalid.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            step: 0,
            metrics: TrainingMetrics::new(),
        })
    }

    /// Returns the training configuration.
    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Returns the number of completed steps.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.step
    }

    /// Returns the recorded metrics.
    #[must_use]
    pub const fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Learning rate the next step will use.
    #[must_use]
    pub fn current_lr(&self) -> f64 {
        self.config.learning_rate_at(self.step)
    }

    /// Performs one training step on image `x` with targets `y`.
    ///
    /// # Errors
    ///
    /// - [`TrainingError::ShapeMismatch`] if the tensors are inconsistent.
    /// - [`TrainingError::NumericalInstability`] if the loss is not finite
    ///   and `fail_on_non_finite` is set. The step counter does not advance.
    pub fn train_step(
        &mut self,
        x: ArrayView3<'_, f64>,
        y: ArrayView4<'_, f64>,
        w1: ArrayView4<'_, f64>,
        w2: ArrayView5<'_, f64>,
    ) -> Result<StepOutput> {
        let lr = self.current_lr();

        let (h, yhat) = forwardprop(x, w1, w2)?;
        let loss = detection_loss(yhat.view(), y)?;
        if !loss.is_finite() {
            if self.config.fail_on_non_finite {
                return Err(TrainingError::numerical_instability(format!(
                    "non-finite loss at step {}: bce = {}, mse = {}",
                    self.step, loss.bce, loss.mse
                )));
            }
            warn!(step = self.step, bce = loss.bce, mse = loss.mse, "non-finite loss");
        }

        let (grad_xi1, grad_xi2) = backprop(y, yhat.view(), h.view(), w2)?;
        let (m1, m2, _, _) = w1.dim();
        let (dw1, dw2) = weight_gradient(x, h.view(), grad_xi1.view(), grad_xi2.view(), m1, m2)?;
        let (new_w1, new_w2) = weight_update(w1, w2, dw1.view(), dw2.view(), lr)?;

        let metrics = StepMetrics::new(self.step, loss)
            .with_learning_rate(lr)
            .with_gradient_norms(frobenius_norm(&dw1), frobenius_norm(&dw2));
        debug!(
            step = self.step,
            lr,
            bce = loss.bce,
            mse = loss.mse,
            dw1_norm = metrics.dw1_norm,
            dw2_norm = metrics.dw2_norm,
            "training step"
        );

        self.metrics.add_step(metrics);
        self.step += 1;

        Ok(StepOutput {
            w1: new_w1,
            w2: new_w2,
            metrics,
        })
    }

    /// Runs the forward pass and returns the configured number of top
    /// detections, capped at the number of anchors.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::ShapeMismatch`] if the weights, image or
    /// anchor grid are inconsistent.
    pub fn evaluate(
        &self,
        x: ArrayView3<'_, f64>,
        w1: ArrayView4<'_, f64>,
        w2: ArrayView5<'_, f64>,
        anchors: &AnchorGrid,
    ) -> Result<Vec<Detection>> {
        let (_, yhat) = forwardprop(x, w1, w2)?;
        let k = self.config.num_detections.min(anchors.len());
        Ok(detect(yhat.view(), k, anchors)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearningRateSchedule;
    use crate::loss::summed_objective;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;

    fn problem() -> (Array3<f64>, Array4<f64>, Array4<f64>, Array5<f64>) {
        let x = Array3::from_shape_fn((4, 4, 2), |(i, j, c)| {
            ((i * 3 + j * 5 + c * 7) % 9) as f64 / 9.0
        });
        let mut y = Array4::<f64>::zeros((4, 4, 2, 5));
        y[[1, 2, 0, 4]] = 1.0;
        y[[1, 2, 0, 0]] = 0.2;
        y[[1, 2, 0, 2]] = -0.1;
        y[[3, 0, 1, 4]] = 1.0;
        let w1 = Array4::from_shape_fn((3, 3, 2, 3), |(a, b, c, d)| {
            ((a * 5 + b * 3 + c * 7 + d * 2) % 11) as f64 / 11.0 - 0.3
        });
        let w2 = Array5::from_shape_fn((1, 1, 3, 2, 5), |(_, _, d, a, k)| {
            ((d * 3 + a * 5 + k * 7) % 13) as f64 / 13.0 - 0.5
        });
        (x, y, w1, w2)
    }

    fn objective(x: &Array3<f64>, y: &Array4<f64>, w1: &Array4<f64>, w2: &Array5<f64>) -> f64 {
        let (_, yhat) = forwardprop(x.view(), w1.view(), w2.view()).unwrap();
        summed_objective(yhat.view(), y.view()).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(
            Trainer::new(TrainingConfig::new(-0.1)),
            Err(TrainingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn step_decreases_objective() {
        let (x, y, w1, w2) = problem();
        let mut trainer = Trainer::new(TrainingConfig::new(1e-3)).unwrap();

        let before = objective(&x, &y, &w1, &w2);
        let out = trainer.train_step(x.view(), y.view(), w1.view(), w2.view()).unwrap();
        let after = objective(&x, &y, &out.w1, &out.w2);

        assert!(after < before, "objective went from {before} to {after}");
        assert!(out.metrics.dw1_norm > 0.0);
        assert!(out.metrics.dw2_norm > 0.0);
    }

    #[test]
    fn repeated_steps_keep_improving() {
        let (x, y, mut w1, mut w2) = problem();
        let mut trainer = Trainer::new(TrainingConfig::new(1e-3)).unwrap();
        let start = objective(&x, &y, &w1, &w2);

        for _ in 0..20 {
            let out = trainer.train_step(x.view(), y.view(), w1.view(), w2.view()).unwrap();
            w1 = out.w1;
            w2 = out.w2;
        }

        assert!(objective(&x, &y, &w1, &w2) < start);
        assert_eq!(trainer.step(), 20);
        assert_eq!(trainer.metrics().steps_completed(), 20);
    }

    #[test]
    fn zero_learning_rate_keeps_weights() {
        let (x, y, w1, w2) = problem();
        let mut trainer = Trainer::new(TrainingConfig::new(0.0)).unwrap();
        let out = trainer.train_step(x.view(), y.view(), w1.view(), w2.view()).unwrap();
        assert_eq!(out.w1, w1);
        assert_eq!(out.w2, w2);
        assert!(out.metrics.total() > 0.0);
    }

    #[test]
    fn schedule_drives_learning_rate() {
        let (x, y, w1, w2) = problem();
        let config = TrainingConfig::new(0.1).with_lr_schedule(LearningRateSchedule::step(0.5, 1));
        let mut trainer = Trainer::new(config).unwrap();

        let first = trainer.train_step(x.view(), y.view(), w1.view(), w2.view()).unwrap();
        let second = trainer.train_step(x.view(), y.view(), w1.view(), w2.view()).unwrap();
        assert_abs_diff_eq!(first.metrics.learning_rate, 0.1, epsilon = 1e-15);
        assert_abs_diff_eq!(second.metrics.learning_rate, 0.05, epsilon = 1e-15);
    }

    #[test]
    fn non_finite_loss_is_rejected() {
        let (x, y, w1, mut w2) = problem();
        w2.fill(f64::NAN);
        let mut trainer = Trainer::new(TrainingConfig::default()).unwrap();
        assert!(matches!(
            trainer.train_step(x.view(), y.view(), w1.view(), w2.view()),
            Err(TrainingError::NumericalInstability(_))
        ));
        assert_eq!(trainer.step(), 0);
    }

    #[test]
    fn non_finite_loss_can_be_allowed() {
        let (x, y, w1, mut w2) = problem();
        w2.fill(f64::NAN);
        let mut trainer = Trainer::new(TrainingConfig::default().allow_non_finite()).unwrap();
        let out = trainer.train_step(x.view(), y.view(), w1.view(), w2.view()).unwrap();
        assert!(!out.metrics.loss.is_finite());
        assert_eq!(trainer.step(), 1);
    }

    #[test]
    fn mismatched_targets_fail() {
        let (x, _, w1, w2) = problem();
        let y = Array4::<f64>::zeros((4, 4, 3, 5));
        let mut trainer = Trainer::new(TrainingConfig::default()).unwrap();
        assert!(matches!(
            trainer.train_step(x.view(), y.view(), w1.view(), w2.view()),
            Err(TrainingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn evaluate_caps_detection_count() {
        let (x, _, w1, w2) = problem();
        let anchors = AnchorGrid::from_base_sizes(4, 4, 8.0, &[(8.0, 8.0), (16.0, 8.0)]).unwrap();

        let trainer = Trainer::new(TrainingConfig::default().with_num_detections(5)).unwrap();
        let found = trainer.evaluate(x.view(), w1.view(), w2.view(), &anchors).unwrap();
        assert_eq!(found.len(), 5);
        assert!(found.windows(2).all(|p| p[0].score >= p[1].score));

        let greedy = Trainer::new(TrainingConfig::default().with_num_detections(100)).unwrap();
        let all = greedy.evaluate(x.view(), w1.view(), w2.view(), &anchors).unwrap();
        assert_eq!(all.len(), 32);
    }
}
