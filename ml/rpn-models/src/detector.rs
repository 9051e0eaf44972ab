//! Top-K selection of anchor predictions.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView4, Axis, s};
use rpn_types::{AnchorGrid, BoxDelta, CLASS_CHANNEL, REGRESSION_CHANNELS, Rect, output_grid};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ModelError, Result};

/// One selected prediction, decoded against its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Decoded rectangle in absolute coordinates.
    pub rect: Rect,
    /// Classification score `Yhat[n1, n2, a, 4]`.
    pub score: f64,
    /// Grid cell `(n1, n2)`.
    pub cell: (usize, usize),
    /// Anchor slot within the cell.
    pub anchor: usize,
}

/// Descending score, then ascending flat `(n1, n2, a)` index.
fn rank(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Selects the `number_to_return` highest-scoring `(cell, anchor)` pairs and
/// decodes their regression outputs into rectangles.
///
/// Results are ordered by descending score. Equal scores are ordered by
/// flat row-major `(n1, n2, a)` index, so duplicates are kept and the output
/// is deterministic. No non-maximum suppression is performed.
///
/// # Errors
///
/// - [`ModelError::ShapeMismatch`] if `yhat` is not `(N1, N2, NA, 5)` or the
///   anchor grid is not `(N1, N2, NA)`.
/// - [`ModelError::InvalidArgument`] if `number_to_return` is 0 or exceeds
///   `N1 * N2 * NA`.
///
/// # Example
///
/// ```
/// use ndarray::Array4;
/// use rpn_models::detect;
/// use rpn_types::AnchorGrid;
///
/// let anchors = AnchorGrid::from_base_sizes(2, 2, 10.0, &[(10.0, 10.0)]).unwrap();
/// let mut yhat = Array4::<f64>::zeros((2, 2, 1, 5));
/// yhat[[1, 0, 0, 4]] = 0.8;
/// yhat[[0, 1, 0, 4]] = 0.3;
///
/// let found = detect(yhat.view(), 1, &anchors).unwrap();
/// assert_eq!(found[0].cell, (1, 0));
/// assert_eq!(found[0].rect, anchors.anchor(1, 0, 0).unwrap());
/// ```
pub fn detect(
    yhat: ArrayView4<'_, f64>,
    number_to_return: usize,
    anchors: &AnchorGrid,
) -> Result<Vec<Detection>> {
    let (n1, n2, na) = output_grid("yhat", yhat.shape())?;
    if anchors.dims() != (n1, n2, na) {
        return Err(ModelError::shape_mismatch(
            "anchors",
            format!("[{n1}, {n2}, {na}, 4]"),
            format!("{:?}", anchors.view().shape()),
        ));
    }

    let total = n1 * n2 * na;
    if number_to_return == 0 || number_to_return > total {
        return Err(ModelError::invalid_argument(format!(
            "number_to_return must be in 1..={total}, got {number_to_return}"
        )));
    }

    let mut ranked: Vec<(usize, f64)> = yhat
        .index_axis(Axis(3), CLASS_CHANNEL)
        .iter()
        .copied()
        .enumerate()
        .collect();
    if number_to_return < total {
        ranked.select_nth_unstable_by(number_to_return - 1, rank);
        ranked.truncate(number_to_return);
    }
    ranked.sort_unstable_by(rank);

    debug!(
        requested = number_to_return,
        candidates = total,
        best = ranked.first().map(|r| r.1),
        "selected top detections"
    );

    ranked
        .into_iter()
        .map(|(flat, score)| {
            let (i, j, a) = (flat / (n2 * na), (flat / na) % n2, flat % na);
            let anchor = anchors.anchor(i, j, a).ok_or_else(|| {
                ModelError::invalid_argument(format!("no anchor at ({i}, {j}, {a})"))
            })?;
            let reg = yhat.slice(s![i, j, a, ..REGRESSION_CHANNELS]);
            let delta = BoxDelta::new(reg[0], reg[1], reg[2], reg[3]);
            Ok(Detection {
                rect: delta.decode(&anchor),
                score,
                cell: (i, j),
                anchor: a,
            })
        })
        .collect()
}

/// Like [`detect`], returning only the rectangles as a
/// `(number_to_return, 4)` array of `[x, y, w, h]` rows.
///
/// # Errors
///
/// Same as [`detect`].
pub fn detect_rects(
    yhat: ArrayView4<'_, f64>,
    number_to_return: usize,
    anchors: &AnchorGrid,
) -> Result<Array2<f64>> {
    let detections = detect(yhat, number_to_return, anchors)?;
    let mut rects = Array2::<f64>::zeros((detections.len(), 4));
    for (mut row, det) in rects.outer_iter_mut().zip(&detections) {
        row.assign(&ndarray::aview1(&det.rect.as_array()));
    }
    Ok(rects)
}
