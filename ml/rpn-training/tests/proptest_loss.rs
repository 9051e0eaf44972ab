//! Property-based tests for the loss, back-propagation and update.
//!
//! Run with: cargo test -p rpn-training -- proptest

use ndarray::{Array3, Array4, Array5, Axis};
use proptest::prelude::*;
use rpn_training::{backprop, detection_loss, regression_loss, summed_objective, weight_update};

// =============================================================================
// Strategies
// =============================================================================

/// Generate a `(yhat, y)` pair on a small grid: scores in `[0, 1]`, labels
/// in `{0, 1}`, regression values unconstrained.
fn arb_prediction_pair() -> impl Strategy<Value = (Array4<f64>, Array4<f64>)> {
    (1usize..4, 1usize..4, 1usize..4).prop_flat_map(|(n1, n2, na)| {
        let len = n1 * n2 * na * 5;
        (
            prop::collection::vec(-5.0..5.0f64, len),
            prop::collection::vec(0.0..=1.0f64, n1 * n2 * na),
            prop::collection::vec(-5.0..5.0f64, len),
            prop::collection::vec(any::<bool>(), n1 * n2 * na),
        )
            .prop_map(move |(mut pred, scores, mut target, labels)| {
                for (cell, (&score, &label)) in scores.iter().zip(&labels).enumerate() {
                    pred[cell * 5 + 4] = score;
                    target[cell * 5 + 4] = if label { 1.0 } else { 0.0 };
                }
                (
                    Array4::from_shape_vec((n1, n2, na, 5), pred).unwrap_or_default(),
                    Array4::from_shape_vec((n1, n2, na, 5), target).unwrap_or_default(),
                )
            })
    })
}

// =============================================================================
// Property Tests: Loss
// =============================================================================

proptest! {
    /// Both loss components are finite and non-negative.
    #[test]
    fn proptest_loss_non_negative((yhat, y) in arb_prediction_pair()) {
        let loss = detection_loss(yhat.view(), y.view()).unwrap();
        prop_assert!(loss.is_finite());
        prop_assert!(loss.bce >= 0.0);
        prop_assert!(loss.mse >= 0.0);
        prop_assert!(summed_objective(yhat.view(), y.view()).unwrap() >= 0.0);
    }

    /// Regression error on negative anchors never changes the loss.
    #[test]
    fn proptest_mse_ignores_negatives((yhat, y) in arb_prediction_pair(), noise in -10.0..10.0f64) {
        let before = regression_loss(yhat.view(), y.view()).unwrap();
        let mut perturbed = yhat.clone();
        for (mut lane, label) in perturbed
            .lanes_mut(Axis(3))
            .into_iter()
            .zip(y.lanes(Axis(3)).into_iter().map(|l| l[4]))
        {
            if label == 0.0 {
                lane[0] += noise;
            }
        }
        let after = regression_loss(perturbed.view(), y.view()).unwrap();
        prop_assert!((before - after).abs() <= 1e-12 * (1.0 + before.abs()));
    }
}

// =============================================================================
// Property Tests: Gradients and Update
// =============================================================================

proptest! {
    /// The output gradient is the prediction error and the hidden gradient
    /// vanishes wherever the unit is inactive.
    #[test]
    fn proptest_backprop_structure(
        (yhat, y) in arb_prediction_pair(),
        seed in prop::collection::vec(-1.0..1.0f64, 8),
    ) {
        let (n1, n2, na, _) = yhat.dim();
        let nd = 2;
        let h = Array3::from_shape_fn((n1, n2, nd), |(i, j, d)| seed[(i + 2 * j + d) % 8].max(0.0));
        let w2 = Array5::from_shape_fn((1, 1, nd, na, 5), |(_, _, d, a, k)| seed[(d + a + k) % 8]);

        let (grad_xi1, grad_xi2) = backprop(y.view(), yhat.view(), h.view(), w2.view()).unwrap();
        prop_assert_eq!(grad_xi2, &yhat - &y);
        for (g, &hv) in grad_xi1.iter().zip(h.iter()) {
            if hv <= 0.0 {
                prop_assert_eq!(*g, 0.0);
            }
        }
    }

    /// A zero gradient leaves the weights untouched for any learning rate.
    #[test]
    fn proptest_zero_gradient_is_fixed_point(
        w in prop::collection::vec(-3.0..3.0f64, 18),
        lr in 0.0..10.0f64,
    ) {
        let w1 = Array4::from_shape_vec((3, 3, 1, 2), w.clone()).unwrap_or_default();
        let w2 = Array5::from_shape_vec((1, 1, 2, 1, 5), w[..10].to_vec()).unwrap_or_default();
        let (new_w1, new_w2) = weight_update(
            w1.view(),
            w2.view(),
            Array4::zeros(w1.dim()).view(),
            Array5::zeros(w2.dim()).view(),
            lr,
        )
        .unwrap();
        prop_assert_eq!(new_w1, w1);
        prop_assert_eq!(new_w2, w2);
    }
}
