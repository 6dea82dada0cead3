//! Numeric helpers shared by the decoder and the suppressor.

use std::cmp::Ordering;

/// Logistic function.
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Returns the index and value of the first maximum entry.
///
/// An empty slice yields `(0, 0.0)`.
pub(crate) fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best_idx = 0usize;
    let mut best = f32::NEG_INFINITY;
    for (idx, &value) in values.iter().enumerate() {
        if value > best {
            best = value;
            best_idx = idx;
        }
    }
    if values.is_empty() {
        (0, 0.0)
    } else {
        (best_idx, best)
    }
}

/// Descending score order; equal scores keep their relative order under a stable sort.
#[inline]
pub(crate) fn score_cmp_desc(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

/// Checks that a threshold is finite and lies in `[0, 1]`.
pub(crate) fn is_unit_interval(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
