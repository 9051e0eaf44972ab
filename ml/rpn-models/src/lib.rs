//! Inference side of the two-layer region proposal network.
//!
//! The network is a 3x3 convolution with ReLU followed by a per-cell dense
//! projection to `NA` anchors with five outputs each: four raw regression
//! values and one sigmoid classification score. Tensors are `ndarray` arrays
//! of `f64` in `(rows, cols, channels, ...)` order.
//!
//! # Building Blocks
//!
//! - [`safe_sigmoid`], [`safe_log`] - Clamped primitives that never return
//!   non-finite values for finite input
//! - [`conv2d_single`], [`conv_layer`] - Zero-padded valid-mode convolution
//! - [`dense_projection`] - The 1x1 second layer as one matrix product
//!
//! # Network
//!
//! - [`forwardprop`] - Input and weights to `(H, Yhat)`
//! - [`NetworkShape`] - Cross-checked dimensions of one network instance
//!
//! # Detection
//!
//! - [`detect`] - Top-K anchors by score, decoded to rectangles
//! - [`detect_rects`] - Same, as a `(K, 4)` array
//!
//! # Example
//!
//! ```
//! use ndarray::{Array3, Array4, Array5};
//! use rpn_models::{detect, forwardprop};
//! use rpn_types::AnchorGrid;
//!
//! let x = Array3::<f64>::from_elem((4, 4, 1), 0.5);
//! let w1 = Array4::<f64>::from_elem((3, 3, 1, 2), 0.1);
//! let w2 = Array5::<f64>::from_elem((1, 1, 2, 3, 5), 0.2);
//!
//! let (_, yhat) = forwardprop(x.view(), w1.view(), w2.view()).unwrap();
//! let anchors =
//!     AnchorGrid::from_base_sizes(4, 4, 8.0, &[(8.0, 8.0), (16.0, 8.0), (8.0, 16.0)]).unwrap();
//! let found = detect(yhat.view(), 5, &anchors).unwrap();
//! assert_eq!(found.len(), 5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod conv;
mod detector;
mod error;
mod forward;
mod numeric;

// Re-export numeric primitives
pub use numeric::{
    SAFE_LOG_MIN, SIGMOID_CUTOFF, safe_log, safe_log_array, safe_sigmoid, safe_sigmoid_array,
};

// Re-export convolution engine
pub use conv::{conv_layer, conv_output_extent, conv2d_single};

// Re-export network
pub use forward::{LAYER1_PADDING, NetworkShape, dense_projection, forwardprop};

// Re-export detection
pub use detector::{Detection, detect, detect_rects};

// Re-export error types
pub use error::{ModelError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        Detection, ModelError, NetworkShape, conv_layer, detect, detect_rects, forwardprop,
        safe_log, safe_sigmoid,
    };
}
