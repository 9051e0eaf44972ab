//! Training for the two-layer region proposal network.
//!
//! Gradients are derived by hand for this fixed architecture; there is no
//! autodiff. One training step is:
//!
//! 1. [`rpn_models::forwardprop`] - `(H, Yhat)` from image and weights
//! 2. [`detection_loss`] - classification and regression loss
//! 3. [`backprop`] - gradients of both excitations
//! 4. [`weight_gradient`] - `(dW1, dW2)`
//! 5. [`weight_update`] - one gradient-descent step
//!
//! [`Trainer`] runs that sequence with a configured learning rate schedule
//! and records [`StepMetrics`].
//!
//! # Loss Conventions
//!
//! The reported loss is [`DetectionLoss`]: BCE averaged over every anchor
//! plus half the squared regression error averaged over positive anchors.
//! The gradients are those of [`summed_objective`], the un-normalised sum
//! over all anchors, for which `dL/dXi2 = Yhat - Y` exactly.
//!
//! # Example
//!
//! ```
//! use ndarray::{Array3, Array4, Array5};
//! use rpn_models::forwardprop;
//! use rpn_training::{backprop, weight_gradient, weight_update};
//!
//! let x = Array3::<f64>::from_elem((4, 4, 1), 0.5);
//! let y = Array4::<f64>::zeros((4, 4, 1, 5));
//! let w1 = Array4::<f64>::from_elem((3, 3, 1, 2), 0.1);
//! let w2 = Array5::<f64>::from_elem((1, 1, 2, 1, 5), 0.1);
//!
//! let (h, yhat) = forwardprop(x.view(), w1.view(), w2.view()).unwrap();
//! let (g1, g2) = backprop(y.view(), yhat.view(), h.view(), w2.view()).unwrap();
//! let (dw1, dw2) = weight_gradient(x.view(), h.view(), g1.view(), g2.view(), 3, 3).unwrap();
//! let (w1, w2) = weight_update(w1.view(), w2.view(), dw1.view(), dw2.view(), 0.01).unwrap();
//! assert_eq!(w2.dim(), (1, 1, 2, 1, 5));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod backprop;
mod config;
mod error;
mod loss;
mod metrics;
mod trainer;
mod update;
mod weight_grad;

// Re-export configuration
pub use config::{LearningRateSchedule, TrainingConfig};

// Re-export loss functions
pub use loss::{
    DetectionLoss, classification_loss, detection_loss, regression_loss, summed_objective,
};

// Re-export gradient computation
pub use backprop::backprop;
pub use update::weight_update;
pub use weight_grad::weight_gradient;

// Re-export metrics
pub use metrics::{StepMetrics, TrainingMetrics};

// Re-export trainer
pub use trainer::{StepOutput, Trainer};

// Re-export error types
pub use error::{Result, TrainingError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        DetectionLoss, LearningRateSchedule, StepMetrics, StepOutput, Trainer, TrainingConfig,
        TrainingError, TrainingMetrics, backprop, detection_loss, summed_objective,
        weight_gradient, weight_update,
    };
}
