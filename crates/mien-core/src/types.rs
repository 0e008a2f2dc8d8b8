use serde::{Deserialize, Serialize};

/// The closed set of primary emotions reported by the external detector.
///
/// `Emotion::ALL` is the declared iteration order for every scan over the
/// set, including argmax and tie-breaking. Do not rely on any other order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
    Neutral,
}

impl Emotion {
    pub const COUNT: usize = 7;

    /// Declared iteration order over the primary emotion set.
    pub const ALL: [Emotion; Emotion::COUNT] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Disgusted => "disgusted",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
        }
    }

    /// Position of this emotion in [`Emotion::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Emotion::Happy => 0,
            Emotion::Sad => 1,
            Emotion::Angry => 2,
            Emotion::Fearful => 3,
            Emotion::Disgusted => 4,
            Emotion::Surprised => 5,
            Emotion::Neutral => 6,
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary labels computed from primary scores, never input directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedEmotion {
    Stressed,
    Confused,
    Tired,
}

impl DerivedEmotion {
    pub const COUNT: usize = 3;

    pub const ALL: [DerivedEmotion; DerivedEmotion::COUNT] = [
        DerivedEmotion::Stressed,
        DerivedEmotion::Confused,
        DerivedEmotion::Tired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedEmotion::Stressed => "stressed",
            DerivedEmotion::Confused => "confused",
            DerivedEmotion::Tired => "tired",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            DerivedEmotion::Stressed => 0,
            DerivedEmotion::Confused => 1,
            DerivedEmotion::Tired => 2,
        }
    }
}

impl std::fmt::Display for DerivedEmotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a raw detector value into [0, 1], mapping NaN/negative to 0.
///
/// Malformed numeric input is never an error anywhere in the pipeline; it
/// degrades to 0 at the boundary.
pub(crate) fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// A score per primary emotion, always fully populated, all values in [0, 1].
///
/// Serializes as a JSON object keyed by lowercase emotion names. Missing keys
/// deserialize to 0; NaN, negative, and out-of-range values are clamped on
/// construction so a vector is well-formed by the time it exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "EmotionMap", into = "EmotionMap")]
pub struct EmotionVector {
    values: [f32; Emotion::COUNT],
}

impl EmotionVector {
    /// All-zero vector.
    pub fn zero() -> Self {
        Self {
            values: [0.0; Emotion::COUNT],
        }
    }

    /// Build from raw per-emotion values in [`Emotion::ALL`] order,
    /// sanitizing each entry.
    pub fn from_raw(values: [f32; Emotion::COUNT]) -> Self {
        let mut sanitized = [0.0; Emotion::COUNT];
        for (out, v) in sanitized.iter_mut().zip(values) {
            *out = sanitize(v);
        }
        Self { values: sanitized }
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        self.values[emotion.index()]
    }

    /// Set one entry, sanitizing the value.
    pub fn set(&mut self, emotion: Emotion, value: f32) {
        self.values[emotion.index()] = sanitize(value);
    }

    /// Iterate entries in [`Emotion::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.get(e)))
    }

    /// Sum of all primary values.
    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    /// The highest-scoring emotion.
    ///
    /// Tie-break: if `prefer` is among the tied maxima it wins, otherwise the
    /// first tied emotion in [`Emotion::ALL`] order. A strict `>` scan in
    /// declared order gives exactly that with a single pass.
    pub fn dominant(&self, prefer: Option<Emotion>) -> Emotion {
        let mut best = Emotion::ALL[0];
        let mut best_value = self.get(best);
        for &e in &Emotion::ALL[1..] {
            let v = self.get(e);
            if v > best_value {
                best = e;
                best_value = v;
            }
        }
        if let Some(p) = prefer {
            if self.get(p) == best_value {
                return p;
            }
        }
        best
    }
}

/// Serde-facing shape: one optional field per emotion, extra keys ignored.
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct EmotionMap {
    happy: f32,
    sad: f32,
    angry: f32,
    fearful: f32,
    disgusted: f32,
    surprised: f32,
    neutral: f32,
}

impl Default for EmotionMap {
    fn default() -> Self {
        Self {
            happy: 0.0,
            sad: 0.0,
            angry: 0.0,
            fearful: 0.0,
            disgusted: 0.0,
            surprised: 0.0,
            neutral: 0.0,
        }
    }
}

impl From<EmotionMap> for EmotionVector {
    fn from(m: EmotionMap) -> Self {
        EmotionVector::from_raw([
            m.happy,
            m.sad,
            m.angry,
            m.fearful,
            m.disgusted,
            m.surprised,
            m.neutral,
        ])
    }
}

impl From<EmotionVector> for EmotionMap {
    fn from(v: EmotionVector) -> Self {
        EmotionMap {
            happy: v.get(Emotion::Happy),
            sad: v.get(Emotion::Sad),
            angry: v.get(Emotion::Angry),
            fearful: v.get(Emotion::Fearful),
            disgusted: v.get(Emotion::Disgusted),
            surprised: v.get(Emotion::Surprised),
            neutral: v.get(Emotion::Neutral),
        }
    }
}

/// Primary vector plus computed secondary labels.
///
/// Derived values are not mutually exclusive categories and never
/// participate in sum-to-one normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedEmotionVector {
    pub primary: EmotionVector,
    derived: [f32; DerivedEmotion::COUNT],
}

impl DerivedEmotionVector {
    pub fn new(primary: EmotionVector, derived: [f32; DerivedEmotion::COUNT]) -> Self {
        let mut sanitized = [0.0; DerivedEmotion::COUNT];
        for (out, v) in sanitized.iter_mut().zip(derived) {
            *out = sanitize(v);
        }
        Self {
            primary,
            derived: sanitized,
        }
    }

    /// Same derived values over a replacement primary vector.
    pub fn with_primary(self, primary: EmotionVector) -> Self {
        Self { primary, ..self }
    }

    pub fn get_derived(&self, emotion: DerivedEmotion) -> f32 {
        self.derived[emotion.index()]
    }

    /// Iterate derived entries in [`DerivedEmotion::ALL`] order.
    pub fn iter_derived(&self) -> impl Iterator<Item = (DerivedEmotion, f32)> + '_ {
        DerivedEmotion::ALL
            .iter()
            .map(move |&e| (e, self.get_derived(e)))
    }
}

/// One detector output for one face on one frame.
///
/// Immutable after creation; owned by the pipeline instance processing that
/// face-track's stream. The sequence number is the arrival order within the
/// track.
#[derive(Debug, Clone, Copy)]
pub struct FrameSample {
    pub vector: EmotionVector,
    pub sequence: u64,
}

impl FrameSample {
    pub fn new(vector: EmotionVector, sequence: u64) -> Self {
        Self { vector, sequence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps() {
        assert_eq!(sanitize(0.5), 0.5);
        assert_eq!(sanitize(-0.2), 0.0);
        assert_eq!(sanitize(1.7), 1.0);
        assert_eq!(sanitize(f32::NAN), 0.0);
        assert_eq!(sanitize(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_from_raw_sanitizes() {
        let v = EmotionVector::from_raw([2.0, -1.0, f32::NAN, 0.3, 0.0, 0.0, 0.0]);
        assert_eq!(v.get(Emotion::Happy), 1.0);
        assert_eq!(v.get(Emotion::Sad), 0.0);
        assert_eq!(v.get(Emotion::Angry), 0.0);
        assert_eq!(v.get(Emotion::Fearful), 0.3);
    }

    #[test]
    fn test_dominant_simple() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Angry, 0.8);
        v.set(Emotion::Happy, 0.3);
        assert_eq!(v.dominant(None), Emotion::Angry);
    }

    #[test]
    fn test_dominant_tie_prefers_committed() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Happy, 0.5);
        v.set(Emotion::Neutral, 0.5);
        // Happy is first in declared order, but a tied preferred label wins.
        assert_eq!(v.dominant(Some(Emotion::Neutral)), Emotion::Neutral);
        assert_eq!(v.dominant(None), Emotion::Happy);
    }

    #[test]
    fn test_dominant_prefer_not_tied_is_ignored() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Sad, 0.9);
        v.set(Emotion::Neutral, 0.1);
        assert_eq!(v.dominant(Some(Emotion::Neutral)), Emotion::Sad);
    }

    #[test]
    fn test_dominant_all_zero_is_first_in_order() {
        let v = EmotionVector::zero();
        assert_eq!(v.dominant(None), Emotion::Happy);
        assert_eq!(v.dominant(Some(Emotion::Neutral)), Emotion::Neutral);
    }

    #[test]
    fn test_serde_missing_keys_default_to_zero() {
        let v: EmotionVector = serde_json::from_str(r#"{"happy": 0.9, "neutral": 0.1}"#).unwrap();
        assert_eq!(v.get(Emotion::Happy), 0.9);
        assert_eq!(v.get(Emotion::Neutral), 0.1);
        assert_eq!(v.get(Emotion::Sad), 0.0);
    }

    #[test]
    fn test_serde_out_of_range_clamped() {
        let v: EmotionVector = serde_json::from_str(r#"{"happy": 3.5, "sad": -1.0}"#).unwrap();
        assert_eq!(v.get(Emotion::Happy), 1.0);
        assert_eq!(v.get(Emotion::Sad), 0.0);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Surprised, 0.25);
        let json = serde_json::to_string(&v).unwrap();
        let back: EmotionVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_emotion_all_matches_index() {
        for (i, e) in Emotion::ALL.iter().enumerate() {
            assert_eq!(e.index(), i);
        }
        for (i, e) in DerivedEmotion::ALL.iter().enumerate() {
            assert_eq!(e.index(), i);
        }
    }
}
