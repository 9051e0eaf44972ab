//! Box and anchor types for the region proposal network.
//!
//! # Types
//!
//! - [`Rect`] - Absolute rectangle `(x, y, w, h)`
//! - [`BoxDelta`] - Anchor-relative regression target `(dx, dy, dw, dh)`
//! - [`AnchorGrid`] - Validated `(N1, N2, NA, 4)` anchor tensor
//!
//! # Box Codec
//!
//! - [`encode`] - Rectangle to regression target
//! - [`decode`] - Regression target back to rectangle
//!
//! # Output Layout
//!
//! Network outputs and training targets share one `(N1, N2, NA, NY)` layout
//! with `NY = 5`: channels `0..4` hold the regression target and channel 4
//! the classification score or label. See [`NY`] and [`CLASS_CHANNEL`].
//!
//! # Example
//!
//! ```
//! use rpn_types::{Rect, decode, encode};
//!
//! let anchor = Rect::new(0.0, 0.0, 16.0, 16.0);
//! let rect = Rect::new(4.0, 2.0, 20.0, 12.0);
//!
//! let back = decode(&encode(&rect, &anchor), &anchor);
//! assert!((back.w - rect.w).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod anchors;
mod error;
mod layout;
mod rect;

// Re-export box types and codec
pub use anchors::AnchorGrid;
pub use rect::{BoxDelta, Rect, decode, encode};

// Re-export layout constants and shape checks
pub use layout::{CLASS_CHANNEL, NY, REGRESSION_CHANNELS, ensure_shape, format_shape, output_grid};

// Re-export error types
pub use error::{Result, TypesError};
