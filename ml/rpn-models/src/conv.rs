//! Zero-padded valid-mode convolution.
//!
//! Kernels are applied flipped (true convolution): with a kernel of size
//! `M`, output `n` reads the padded input at `n + j` with weight
//! `W[M - 1 - j]`. For a 3x3 kernel and padding 1 this is
//! `Xi[n] = sum_m W[m] * H[n - (m - 1)]`, i.e. the kernel is indexed from
//! its centre.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayView4, ArrayViewMut2, Axis, s};
use rpn_types::format_shape;

use crate::error::{ModelError, Result};

/// Returns the output extent `N - M + 1 + 2p` on each axis.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] if the kernel is empty or larger
/// than the padded input on either axis.
pub fn conv_output_extent(
    input: (usize, usize),
    kernel: (usize, usize),
    padding: usize,
) -> Result<(usize, usize)> {
    let padded = (input.0 + 2 * padding, input.1 + 2 * padding);
    if kernel.0 == 0 || kernel.1 == 0 || kernel.0 > padded.0 || kernel.1 > padded.1 {
        return Err(ModelError::shape_mismatch(
            "convolution kernel",
            format!("non-empty kernel no larger than padded input {padded:?}"),
            format!("{kernel:?}"),
        ));
    }
    Ok((padded.0 - kernel.0 + 1, padded.1 - kernel.1 + 1))
}

/// Copies `h` into the centre of a zero matrix grown by `padding` on every side.
fn zero_pad(h: ArrayView2<'_, f64>, padding: usize) -> Array2<f64> {
    let (n1, n2) = h.dim();
    let mut padded = Array2::<f64>::zeros((n1 + 2 * padding, n2 + 2 * padding));
    padded
        .slice_mut(s![padding..padding + n1, padding..padding + n2])
        .assign(&h);
    padded
}

/// Adds the flipped-kernel correlation of `padded` with `w` into `out`.
///
/// `out` must already have the valid-mode extent for this kernel.
fn accumulate_correlation(
    out: &mut ArrayViewMut2<'_, f64>,
    padded: ArrayView2<'_, f64>,
    w: ArrayView2<'_, f64>,
) {
    let (o1, o2) = out.dim();
    let (m1, m2) = w.dim();
    for j1 in 0..m1 {
        for j2 in 0..m2 {
            let tap = w[[m1 - 1 - j1, m2 - 1 - j2]];
            out.scaled_add(tap, &padded.slice(s![j1..j1 + o1, j2..j2 + o2]));
        }
    }
}

/// Single-channel 2D convolution of `h` with kernel `w`.
///
/// `h` is zero-padded by `padding` rows and columns before and after, and
/// only positions where the kernel fully overlaps the padded input are
/// produced. Output shape is `(N1 - M1 + 1 + 2p, N2 - M2 + 1 + 2p)`.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] if the kernel does not fit.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use rpn_models::conv2d_single;
///
/// let h = array![[1.0, 2.0], [3.0, 4.0]];
/// let w = array![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
/// let xi = conv2d_single(h.view(), w.view(), 1).unwrap();
/// assert_eq!(xi, h);
/// ```
pub fn conv2d_single(
    h: ArrayView2<'_, f64>,
    w: ArrayView2<'_, f64>,
    padding: usize,
) -> Result<Array2<f64>> {
    let extent = conv_output_extent(h.dim(), w.dim(), padding)?;
    let padded = zero_pad(h, padding);
    let mut xi = Array2::<f64>::zeros(extent);
    accumulate_correlation(&mut xi.view_mut(), padded.view(), w);
    Ok(xi)
}

/// Multi-channel convolutional layer.
///
/// For input `h` of shape `(N1, N2, NC)` and kernel `w` of shape
/// `(M1, M2, NC, ND)`, output channel `d` is
/// `sum_c conv2d_single(h[:, :, c], w[:, :, c, d], padding)`.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] if the channel counts disagree or
/// the kernel does not fit.
pub fn conv_layer(
    h: ArrayView3<'_, f64>,
    w: ArrayView4<'_, f64>,
    padding: usize,
) -> Result<Array3<f64>> {
    let (n1, n2, nc) = h.dim();
    let (m1, m2, wc, nd) = w.dim();
    if wc != nc {
        return Err(ModelError::shape_mismatch(
            "conv_layer kernel",
            format!("[{m1}, {m2}, {nc}, {nd}]"),
            format_shape(w.shape()),
        ));
    }

    let (o1, o2) = conv_output_extent((n1, n2), (m1, m2), padding)?;
    let mut xi = Array3::<f64>::zeros((o1, o2, nd));

    for c in 0..nc {
        let padded = zero_pad(h.index_axis(Axis(2), c), padding);
        for d in 0..nd {
            let mut out = xi.index_axis_mut(Axis(2), d);
            accumulate_correlation(&mut out, padded.view(), w.slice(s![.., .., c, d]));
        }
    }

    Ok(xi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array4, array};

    /// Direct transcription of the definition, for comparison.
    fn conv2d_reference(h: &Array2<f64>, w: &Array2<f64>, padding: usize) -> Array2<f64> {
        let (n1, n2) = h.dim();
        let (m1, m2) = w.dim();
        let p = padding as isize;
        let (o1, o2) = (n1 + 2 * padding + 1 - m1, n2 + 2 * padding + 1 - m2);
        Array2::from_shape_fn((o1, o2), |(i, j)| {
            let mut acc = 0.0;
            for a in 0..m1 {
                for b in 0..m2 {
                    let r = i as isize + (m1 - 1 - a) as isize - p;
                    let c = j as isize + (m2 - 1 - b) as isize - p;
                    if r >= 0 && c >= 0 && (r as usize) < n1 && (c as usize) < n2 {
                        acc += w[[a, b]] * h[[r as usize, c as usize]];
                    }
                }
            }
            acc
        })
    }

    #[test]
    fn output_extent() {
        assert_eq!(conv_output_extent((4, 4), (3, 3), 1).ok(), Some((4, 4)));
        assert_eq!(conv_output_extent((5, 7), (3, 3), 0).ok(), Some((3, 5)));
        assert_eq!(conv_output_extent((2, 2), (1, 1), 1).ok(), Some((4, 4)));
        assert!(conv_output_extent((2, 2), (5, 3), 1).is_err());
        assert!(conv_output_extent((2, 2), (0, 3), 1).is_err());
    }

    #[test]
    fn kernel_is_flipped() {
        // A single tap at (0, 0) reads H[n + 1]: the image moves up-left.
        let h = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let w = array![[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let xi = conv2d_single(h.view(), w.view(), 1).unwrap();
        let expected = array![[5.0, 6.0, 0.0], [8.0, 9.0, 0.0], [0.0, 0.0, 0.0]];
        assert_abs_diff_eq!(xi, expected, epsilon = 1e-12);
    }

    #[test]
    fn matches_reference_on_rectangular_input() {
        let h = Array2::from_shape_fn((4, 6), |(i, j)| (i * 6 + j) as f64 * 0.5 - 3.0);
        let w = array![[0.2, -1.0, 0.5], [1.5, 0.0, -0.3]];
        for padding in 0..3 {
            let xi = conv2d_single(h.view(), w.view(), padding).unwrap();
            let expected = conv2d_reference(&h, &w, padding);
            assert_eq!(xi.dim(), expected.dim());
            assert_abs_diff_eq!(xi, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn conv_layer_shape_contract() {
        let h = Array3::<f64>::ones((4, 4, 2));
        let w = Array4::<f64>::ones((3, 3, 2, 3));
        let xi = conv_layer(h.view(), w.view(), 1).unwrap();
        assert_eq!(xi.dim(), (4, 4, 3));
        // Interior cells see all 9 taps on both channels.
        assert_abs_diff_eq!(xi[[1, 1, 0]], 18.0, epsilon = 1e-12);
        // Corners see 4 taps.
        assert_abs_diff_eq!(xi[[0, 0, 2]], 8.0, epsilon = 1e-12);
    }

    #[test]
    fn conv_layer_sums_single_channel_convolutions() {
        let h =
            Array3::from_shape_fn((3, 4, 2), |(i, j, c)| ((i + 2 * j + 3 * c) % 5) as f64 - 2.0);
        let w = Array4::from_shape_fn((3, 3, 2, 2), |(a, b, c, d)| {
            ((a * 7 + b * 3 + c * 5 + d) % 4) as f64 * 0.25 - 0.4
        });
        let xi = conv_layer(h.view(), w.view(), 1).unwrap();
        for d in 0..2 {
            let mut expected = Array2::<f64>::zeros((3, 4));
            for c in 0..2 {
                expected += &conv2d_single(
                    h.index_axis(Axis(2), c),
                    w.slice(s![.., .., c, d]),
                    1,
                )
                .unwrap();
            }
            assert_abs_diff_eq!(xi.index_axis(Axis(2), d), expected.view(), epsilon = 1e-12);
        }
    }

    #[test]
    fn conv_layer_rejects_channel_mismatch() {
        let h = Array3::<f64>::ones((4, 4, 2));
        let w = Array4::<f64>::ones((3, 3, 3, 1));
        assert!(matches!(
            conv_layer(h.view(), w.view(), 1),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
