//! Normalizer — final range guarantee, optional sum-to-one rescale.
//!
//! Runs over primary keys only; derived labels are not mutually exclusive
//! categories and never participate in the sum constraint.

use crate::types::{Emotion, EmotionVector};

/// Clamp every primary value into [0, 1]; when `sum_to_one` is set and the
/// values sum above zero, divide each by the sum. A zero-sum vector is
/// returned unchanged — there is nothing to rescale and no division by zero.
pub fn normalize(vector: &EmotionVector, sum_to_one: bool) -> EmotionVector {
    if !sum_to_one {
        return *vector;
    }
    let sum = vector.sum();
    if sum <= 0.0 {
        return *vector;
    }
    let mut out = EmotionVector::zero();
    for &emotion in &Emotion::ALL {
        out.set(emotion, vector.get(emotion) / sum);
    }
    out
}
