//! Per-step training metrics.

use serde::{Deserialize, Serialize};

use crate::loss::DetectionLoss;

/// Metrics for a single training step.
///
/// # Example
///
/// ```
/// use rpn_training::{DetectionLoss, StepMetrics};
///
/// let metrics = StepMetrics::new(0, DetectionLoss::new(0.6, 0.1)).with_learning_rate(0.01);
/// assert!((metrics.total() - 0.7).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Step number (0-indexed).
    pub step: usize,

    /// Loss before the update.
    pub loss: DetectionLoss,

    /// Learning rate used for the update.
    pub learning_rate: f64,

    /// Frobenius norm of `dW1`.
    pub dw1_norm: f64,

    /// Frobenius norm of `dW2`.
    pub dw2_norm: f64,
}

impl StepMetrics {
    /// Creates metrics for a step.
    #[must_use]
    pub const fn new(step: usize, loss: DetectionLoss) -> Self {
        Self {
            step,
            loss,
            learning_rate: 0.0,
            dw1_norm: 0.0,
            dw2_norm: 0.0,
        }
    }

    /// Sets the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the gradient norms.
    #[must_use]
    pub const fn with_gradient_norms(mut self, dw1_norm: f64, dw2_norm: f64) -> Self {
        self.dw1_norm = dw1_norm;
        self.dw2_norm = dw2_norm;
        self
    }

    /// Returns the combined loss.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.loss.total()
    }
}

/// Running history of training steps.
///
/// # Example
///
/// ```
/// use rpn_training::{DetectionLoss, StepMetrics, TrainingMetrics};
///
/// let mut metrics = TrainingMetrics::new();
/// metrics.add_step(StepMetrics::new(0, DetectionLoss::new(0.8, 0.2)));
/// metrics.add_step(StepMetrics::new(1, DetectionLoss::new(0.5, 0.1)));
///
/// assert_eq!(metrics.steps_completed(), 2);
/// assert!((metrics.mean_total().unwrap_or(0.0) - 0.8).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Metrics for each step, in order.
    pub steps: Vec<StepMetrics>,

    /// Lowest finite total loss seen.
    pub best_loss: Option<f64>,

    /// Step with the lowest total loss.
    pub best_step: Option<usize>,
}

impl TrainingMetrics {
    /// Creates empty metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a step.
    pub fn add_step(&mut self, metrics: StepMetrics) {
        let total = metrics.total();
        if total.is_finite() && self.best_loss.is_none_or(|best| total < best) {
            self.best_loss = Some(total);
            self.best_step = Some(metrics.step);
        }
        self.steps.push(metrics);
    }

    /// Returns the number of recorded steps.
    #[must_use]
    pub fn steps_completed(&self) -> usize {
        self.steps.len()
    }

    /// Returns the most recent step.
    #[must_use]
    pub fn last(&self) -> Option<&StepMetrics> {
        self.steps.last()
    }

    /// Returns the mean total loss over all recorded steps.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_total(&self) -> Option<f64> {
        if self.steps.is_empty() {
            return None;
        }
        let sum: f64 = self.steps.iter().map(StepMetrics::total).sum();
        Some(sum / self.steps.len() as f64)
    }
}
