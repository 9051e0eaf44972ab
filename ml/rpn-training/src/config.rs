//! Training configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Configuration for single-image training steps.
///
/// # Example
///
/// ```
/// use rpn_training::{LearningRateSchedule, TrainingConfig};
///
/// let config = TrainingConfig::new(0.05).with_lr_schedule(LearningRateSchedule::step(0.5, 100));
/// assert!(config.is_valid());
/// assert!((config.learning_rate_at(100) - 0.025).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Base learning rate.
    pub learning_rate: f64,

    /// Learning rate schedule, indexed by step.
    pub lr_schedule: LearningRateSchedule,

    /// Number of detections reported per evaluated image.
    pub num_detections: usize,

    /// Whether a non-finite loss aborts the step.
    pub fail_on_non_finite: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(1e-2)
    }
}

impl TrainingConfig {
    /// Creates a config with the given base learning rate.
    #[must_use]
    pub const fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            lr_schedule: LearningRateSchedule::Constant,
            num_detections: 10,
            fail_on_non_finite: true,
        }
    }

    /// Sets the learning rate schedule.
    #[must_use]
    pub const fn with_lr_schedule(mut self, schedule: LearningRateSchedule) -> Self {
        self.lr_schedule = schedule;
        self
    }

    /// Sets the number of detections.
    #[must_use]
    pub const fn with_num_detections(mut self, num_detections: usize) -> Self {
        self.num_detections = num_detections;
        self
    }

    /// Keeps training through non-finite losses.
    #[must_use]
    pub const fn allow_non_finite(mut self) -> Self {
        self.fail_on_non_finite = false;
        self
    }

    /// Returns the learning rate for a given step.
    #[must_use]
    pub fn learning_rate_at(&self, step: usize) -> f64 {
        self.lr_schedule.compute_lr(self.learning_rate, step)
    }

    /// Returns `true` if all values are valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.learning_rate.is_finite()
            && self.learning_rate >= 0.0
            && self.num_detections > 0
            && self.lr_schedule.is_valid()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(TrainingError::invalid_config(format!(
                "learning_rate must be finite and >= 0, got {}",
                self.learning_rate
            )));
        }
        if self.num_detections == 0 {
            return Err(TrainingError::invalid_config("num_detections must be > 0"));
        }
        if !self.lr_schedule.is_valid() {
            return Err(TrainingError::invalid_config(format!(
                "invalid lr_schedule {:?}",
                self.lr_schedule
            )));
        }
        Ok(())
    }
}

/// Learning rate schedule.
///
/// # Example
///
/// ```
/// use rpn_training::LearningRateSchedule;
///
/// let schedule = LearningRateSchedule::exponential(0.5);
/// assert!((schedule.compute_lr(1.0, 2) - 0.25).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum LearningRateSchedule {
    /// Constant learning rate.
    #[default]
    Constant,

    /// Step decay: multiply by factor every `step_size` steps.
    Step {
        /// Decay factor.
        factor: f64,
        /// Steps between decays.
        step_size: usize,
    },

    /// Exponential decay: lr * gamma^step.
    Exponential {
        /// Decay rate per step.
        gamma: f64,
    },
}

impl LearningRateSchedule {
    /// Creates a step decay schedule.
    #[must_use]
    pub const fn step(factor: f64, step_size: usize) -> Self {
        Self::Step { factor, step_size }
    }

    /// Creates an exponential decay schedule.
    #[must_use]
    pub const fn exponential(gamma: f64) -> Self {
        Self::Exponential { gamma }
    }

    /// Returns `true` if the schedule parameters are usable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Constant => true,
            Self::Step { factor, step_size } => {
                factor.is_finite() && factor >= 0.0 && step_size > 0
            }
            Self::Exponential { gamma } => gamma.is_finite() && gamma >= 0.0,
        }
    }

    /// Computes the learning rate for a given step (0-indexed).
    ///
    /// Exponents beyond `i32::MAX` saturate.
    #[must_use]
    pub fn compute_lr(&self, base_lr: f64, step: usize) -> f64 {
        let exponent = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        match *self {
            Self::Constant => base_lr,
            Self::Step { factor, step_size } => {
                let decays = step / step_size.max(1);
                base_lr * factor.powi(exponent(decays))
            }
            Self::Exponential { gamma } => base_lr * gamma.powi(exponent(step)),
        }
    }
}
