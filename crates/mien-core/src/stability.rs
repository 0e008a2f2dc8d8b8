//! Stability gate — hysteresis on the reported dominant emotion.
//!
//! The full score vector updates every frame; only the single dominant label
//! surfaced for headline display lags. A challenger must win argmax for a
//! configured run of consecutive frames before the committed label flips.
//!
//! Contract: the initial committed label is `neutral`.

use crate::types::{Emotion, EmotionVector};

/// Per-face-track hysteresis state.
#[derive(Debug, Clone)]
pub struct StabilityState {
    committed: Emotion,
    /// Consecutive argmax wins per challenger; all cleared on commit.
    counters: [u32; Emotion::COUNT],
    hysteresis_frames: u32,
}

impl StabilityState {
    /// `hysteresis_frames` must already be validated (>= 1).
    pub fn new(hysteresis_frames: u32) -> Self {
        Self {
            committed: Emotion::Neutral,
            counters: [0; Emotion::COUNT],
            hysteresis_frames,
        }
    }

    /// Currently committed dominant label.
    pub fn committed(&self) -> Emotion {
        self.committed
    }

    /// Feed one smoothed vector; returns the committed label after the
    /// update.
    ///
    /// Argmax ties keep the committed label if it is among the maxima,
    /// otherwise the first tied emotion in `Emotion::ALL` order wins.
    /// A frame where the committed label wins clears every challenger
    /// counter — challenger runs must be consecutive.
    pub fn observe(&mut self, smoothed: &EmotionVector) -> Emotion {
        let candidate = smoothed.dominant(Some(self.committed));

        if candidate == self.committed {
            self.counters = [0; Emotion::COUNT];
            return self.committed;
        }

        // A challenger's run is consecutive: any frame it does not win —
        // whether the committed label or another challenger takes argmax —
        // zeroes its counter.
        let run = self.counters[candidate.index()] + 1;
        self.counters = [0; Emotion::COUNT];
        self.counters[candidate.index()] = run;
        if self.counters[candidate.index()] >= self.hysteresis_frames {
            tracing::debug!(
                from = %self.committed,
                to = %candidate,
                frames = self.hysteresis_frames,
                "dominant label flipped"
            );
            self.committed = candidate;
            self.counters = [0; Emotion::COUNT];
        }
        self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(emotion: Emotion) -> EmotionVector {
        let mut v = EmotionVector::zero();
        v.set(emotion, 0.9);
        v.set(Emotion::Neutral, 0.1);
        v
    }

    #[test]
    fn test_initial_state_is_neutral() {
        let s = StabilityState::new(3);
        assert_eq!(s.committed(), Emotion::Neutral);
    }

    #[test]
    fn test_flip_on_exact_frame() {
        // Neutral start, angry wins argmax for 3 frames with
        // hysteresis 3 → still neutral after frames 1 and 2, angry on 3.
        let mut s = StabilityState::new(3);
        assert_eq!(s.observe(&peak(Emotion::Angry)), Emotion::Neutral);
        assert_eq!(s.observe(&peak(Emotion::Angry)), Emotion::Neutral);
        assert_eq!(s.observe(&peak(Emotion::Angry)), Emotion::Angry);
    }

    #[test]
    fn test_interrupted_run_never_flips() {
        // Challenger wins n-1 frames, reverts, wins n-1 again: no flip.
        let mut s = StabilityState::new(3);
        s.observe(&peak(Emotion::Happy));
        s.observe(&peak(Emotion::Happy));
        assert_eq!(s.observe(&peak(Emotion::Neutral)), Emotion::Neutral);
        s.observe(&peak(Emotion::Happy));
        assert_eq!(s.observe(&peak(Emotion::Happy)), Emotion::Neutral);
    }

    #[test]
    fn test_hysteresis_one_flips_immediately() {
        let mut s = StabilityState::new(1);
        assert_eq!(s.observe(&peak(Emotion::Sad)), Emotion::Sad);
    }

    #[test]
    fn test_committed_win_resets_all_counters() {
        let mut s = StabilityState::new(2);
        s.observe(&peak(Emotion::Happy)); // happy counter = 1
        s.observe(&peak(Emotion::Neutral)); // committed wins, counters cleared
        s.observe(&peak(Emotion::Happy)); // happy counter back to 1
        assert_eq!(s.committed(), Emotion::Neutral);
        assert_eq!(s.observe(&peak(Emotion::Happy)), Emotion::Happy);
    }

    #[test]
    fn test_counters_cleared_after_flip() {
        let mut s = StabilityState::new(2);
        s.observe(&peak(Emotion::Angry));
        assert_eq!(s.observe(&peak(Emotion::Angry)), Emotion::Angry);
        // New challenger starts from zero against the new committed label.
        assert_eq!(s.observe(&peak(Emotion::Sad)), Emotion::Angry);
        assert_eq!(s.observe(&peak(Emotion::Sad)), Emotion::Sad);
    }

    #[test]
    fn test_alternating_challengers_never_flip() {
        let mut s = StabilityState::new(3);
        for _ in 0..5 {
            s.observe(&peak(Emotion::Happy));
            s.observe(&peak(Emotion::Sad));
        }
        // Each challenger's run is broken by the other before reaching 3.
        assert_eq!(s.committed(), Emotion::Neutral);
    }

    #[test]
    fn test_tie_keeps_committed() {
        let mut s = StabilityState::new(1);
        let mut v = EmotionVector::zero();
        v.set(Emotion::Happy, 0.5);
        v.set(Emotion::Neutral, 0.5);
        // Tied with the committed label → committed wins, no flip even at
        // hysteresis 1.
        assert_eq!(s.observe(&v), Emotion::Neutral);
    }
}
