//! Rectangles and the anchor-relative box codec.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle `(x, y, w, h)` in absolute image coordinates.
///
/// Anchors use the same type; an anchor is only usable for encoding when
/// [`Rect::is_valid_anchor`] holds.
///
/// # Example
///
/// ```
/// use rpn_types::Rect;
///
/// let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
/// assert_eq!(rect.as_array(), [10.0, 20.0, 30.0, 40.0]);
/// assert!((rect.area() - 1200.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Creates a rectangle from `[x, y, w, h]`.
    #[must_use]
    pub const fn from_array(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Returns `[x, y, w, h]`.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 4] {
        [self.x, self.y, self.w, self.h]
    }

    /// Returns the area `w * h`.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Returns true when width and height are finite and strictly positive.
    #[must_use]
    pub fn is_valid_anchor(&self) -> bool {
        self.w.is_finite() && self.h.is_finite() && self.w > 0.0 && self.h > 0.0
    }

    /// Encodes this rectangle relative to `anchor`. See [`encode`].
    #[must_use]
    pub fn encode(&self, anchor: &Self) -> BoxDelta {
        encode(self, anchor)
    }
}

/// Anchor-relative regression target `(dx, dy, dw, dh)`.
///
/// Matches channels `0..4` of a network output or target tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDelta {
    /// Horizontal offset in anchor widths.
    pub dx: f64,
    /// Vertical offset in anchor heights.
    pub dy: f64,
    /// Log width ratio.
    pub dw: f64,
    /// Log height ratio.
    pub dh: f64,
}

impl BoxDelta {
    /// Creates a new regression target.
    #[must_use]
    pub const fn new(dx: f64, dy: f64, dw: f64, dh: f64) -> Self {
        Self { dx, dy, dw, dh }
    }

    /// Creates a regression target from `[dx, dy, dw, dh]`.
    #[must_use]
    pub const fn from_array(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Returns `[dx, dy, dw, dh]`.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 4] {
        [self.dx, self.dy, self.dw, self.dh]
    }

    /// Decodes this target against `anchor`. See [`decode`].
    #[must_use]
    pub fn decode(&self, anchor: &Rect) -> Rect {
        decode(self, anchor)
    }
}

/// Converts a rectangle into a regression target with respect to `anchor`.
///
/// `dx = (x - ax) / aw`, `dy = (y - ay) / ah`, `dw = ln(w / aw)`,
/// `dh = ln(h / ah)`. The anchor must satisfy [`Rect::is_valid_anchor`];
/// the result is meaningless otherwise.
///
/// # Example
///
/// ```
/// use rpn_types::{Rect, encode};
///
/// let anchor = Rect::new(0.0, 0.0, 10.0, 10.0);
/// let delta = encode(&Rect::new(5.0, -5.0, 10.0, 20.0), &anchor);
/// assert!((delta.dx - 0.5).abs() < 1e-12);
/// assert!((delta.dy + 0.5).abs() < 1e-12);
/// assert!(delta.dw.abs() < 1e-12);
/// assert!((delta.dh - 2.0_f64.ln()).abs() < 1e-12);
/// ```
#[must_use]
pub fn encode(rect: &Rect, anchor: &Rect) -> BoxDelta {
    BoxDelta {
        dx: (rect.x - anchor.x) / anchor.w,
        dy: (rect.y - anchor.y) / anchor.h,
        dw: (rect.w / anchor.w).ln(),
        dh: (rect.h / anchor.h).ln(),
    }
}

/// Converts a regression target back into an absolute rectangle.
///
/// Exact inverse of [`encode`] for valid anchors.
#[must_use]
pub fn decode(delta: &BoxDelta, anchor: &Rect) -> Rect {
    Rect {
        x: delta.dx.mul_add(anchor.w, anchor.x),
        y: delta.dy.mul_add(anchor.h, anchor.y),
        w: delta.dw.exp() * anchor.w,
        h: delta.dh.exp() * anchor.h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn encode_identity_is_zero() {
        let anchor = Rect::new(3.0, 4.0, 8.0, 16.0);
        let delta = encode(&anchor, &anchor);
        assert_eq!(delta.as_array(), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn decode_zero_is_anchor() {
        let anchor = Rect::new(3.0, 4.0, 8.0, 16.0);
        let rect = decode(&BoxDelta::new(0.0, 0.0, 0.0, 0.0), &anchor);
        assert_relative_eq!(rect.x, 3.0);
        assert_relative_eq!(rect.y, 4.0);
        assert_relative_eq!(rect.w, 8.0);
        assert_relative_eq!(rect.h, 16.0);
    }

    #[test]
    fn decode_scales_by_anchor_size() {
        let anchor = Rect::new(10.0, 20.0, 4.0, 2.0);
        let rect = BoxDelta::new(0.5, -1.0, 2.0_f64.ln(), 0.5_f64.ln()).decode(&anchor);
        assert_relative_eq!(rect.x, 12.0, epsilon = 1e-12);
        assert_relative_eq!(rect.y, 18.0, epsilon = 1e-12);
        assert_relative_eq!(rect.w, 8.0, epsilon = 1e-12);
        assert_relative_eq!(rect.h, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn round_trip() {
        let anchor = Rect::new(-2.0, 7.5, 3.0, 11.0);
        let rect = Rect::new(1.25, 0.5, 0.75, 40.0);
        let back = rect.encode(&anchor).decode(&anchor);
        assert_relative_eq!(back.x, rect.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, rect.y, epsilon = 1e-12);
        assert_relative_eq!(back.w, rect.w, max_relative = 1e-12);
        assert_relative_eq!(back.h, rect.h, max_relative = 1e-12);
    }

    #[test]
    fn anchor_validity() {
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_valid_anchor());
        assert!(!Rect::new(0.0, 0.0, 0.0, 1.0).is_valid_anchor());
        assert!(!Rect::new(0.0, 0.0, 1.0, -1.0).is_valid_anchor());
        assert!(!Rect::new(0.0, 0.0, f64::NAN, 1.0).is_valid_anchor());
        assert!(!Rect::new(0.0, 0.0, f64::INFINITY, 1.0).is_valid_anchor());
    }

    #[test]
    fn array_conversions() {
        let rect = Rect::from_array([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(rect, Rect::new(1.0, 2.0, 3.0, 4.0));
        let delta = BoxDelta::from_array([0.1, 0.2, 0.3, 0.4]);
        assert_eq!(delta.as_array(), [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn rect_serialization() {
        let rect = Rect::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&rect);
        assert!(json.is_ok());

        let parsed: std::result::Result<Rect, _> = serde_json::from_str(&json.unwrap_or_default());
        assert!(parsed.is_ok());
        assert_eq!(parsed.ok(), Some(rect));
    }
}
