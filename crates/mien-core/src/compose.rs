//! Derived-emotion composer — secondary labels as clamped linear
//! combinations of primary scores.

use crate::config::DerivedFormula;
use crate::types::{DerivedEmotion, DerivedEmotionVector, EmotionVector};

/// Evaluate each formula against the primary vector, clamping every result
/// to [0, 1]. The input vector is carried through untouched.
///
/// A derived emotion with no formula stays 0; when the same target appears
/// twice, the last formula wins.
pub fn compose(vector: &EmotionVector, formulas: &[DerivedFormula]) -> DerivedEmotionVector {
    let mut derived = [0.0f32; DerivedEmotion::COUNT];
    for formula in formulas {
        let value: f32 = formula
            .terms
            .iter()
            .map(|t| vector.get(t.emotion) * t.coefficient)
            .sum();
        derived[formula.target.index()] = value.clamp(0.0, 1.0);
    }
    DerivedEmotionVector::new(*vector, derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_formulas, FormulaTerm};
    use crate::types::Emotion;

    #[test]
    fn test_stressed_from_anger_and_fear() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Angry, 0.5);
        v.set(Emotion::Fearful, 0.4);
        let out = compose(&v, &default_formulas());
        // 0.5*0.6 + 0.4*0.5 = 0.5
        assert!((out.get_derived(DerivedEmotion::Stressed) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_derived_clamped_to_one() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Sad, 1.0);
        v.set(Emotion::Neutral, 1.0);
        let formulas = vec![DerivedFormula::new(
            DerivedEmotion::Tired,
            vec![
                FormulaTerm {
                    emotion: Emotion::Sad,
                    coefficient: 3.0,
                },
                FormulaTerm {
                    emotion: Emotion::Neutral,
                    coefficient: 3.0,
                },
            ],
        )];
        let out = compose(&v, &formulas);
        assert_eq!(out.get_derived(DerivedEmotion::Tired), 1.0);
    }

    #[test]
    fn test_negative_coefficient_clamped_to_zero() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Happy, 0.8);
        let formulas = vec![DerivedFormula::new(
            DerivedEmotion::Confused,
            vec![FormulaTerm {
                emotion: Emotion::Happy,
                coefficient: -1.0,
            }],
        )];
        let out = compose(&v, &formulas);
        assert_eq!(out.get_derived(DerivedEmotion::Confused), 0.0);
    }

    #[test]
    fn test_input_vector_unchanged() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Surprised, 0.7);
        let out = compose(&v, &default_formulas());
        assert_eq!(out.primary, v);
    }

    #[test]
    fn test_unlisted_targets_stay_zero() {
        let v = EmotionVector::zero();
        let formulas = vec![DerivedFormula::new(
            DerivedEmotion::Tired,
            vec![FormulaTerm {
                emotion: Emotion::Sad,
                coefficient: 1.0,
            }],
        )];
        let out = compose(&v, &formulas);
        assert_eq!(out.get_derived(DerivedEmotion::Stressed), 0.0);
        assert_eq!(out.get_derived(DerivedEmotion::Confused), 0.0);
    }

    #[test]
    fn test_deterministic() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Angry, 0.33);
        v.set(Emotion::Fearful, 0.21);
        let a = compose(&v, &default_formulas());
        let b = compose(&v, &default_formulas());
        assert_eq!(a, b);
    }
}
