//! Confidence gate — zero out per-emotion values below the floor.

use crate::types::{Emotion, EmotionVector};

/// Keep each value iff it is at least `floor`, otherwise zero it.
///
/// Pure and idempotent. The floor is validated at pipeline construction;
/// this function assumes it is already in [0, 1].
pub fn gate(vector: &EmotionVector, floor: f32) -> EmotionVector {
    let mut out = EmotionVector::zero();
    for (emotion, value) in vector.iter() {
        if value >= floor {
            out.set(emotion, value);
        }
    }
    out
}
