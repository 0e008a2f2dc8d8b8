//! Temporal smoother — damp frame-to-frame jitter in gated vectors.
//!
//! Two strategies, selected by [`SmoothingStrategy`]: a weighted-pair blend
//! against the previous smoothed output, or an elementwise mean over a
//! bounded window of recent samples. Either way the first sample of a track
//! passes through unchanged — no history, no smoothing.

use crate::config::SmoothingStrategy;
use crate::types::{Emotion, EmotionVector};
use std::collections::VecDeque;

/// Bounded FIFO of the most recent samples for one face-track.
///
/// Push-then-trim: the new sample always enters, then the oldest is evicted
/// once the window exceeds capacity. Insertion order is arrival order.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    samples: VecDeque<EmotionVector>,
    capacity: usize,
}

impl SmoothingWindow {
    /// Capacity must already be validated (1..=MAX_WINDOW_SIZE).
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, sample: EmotionVector) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Elementwise arithmetic mean over the current contents.
    ///
    /// Recomputed from the samples still in the window, so eviction never
    /// needs values that have already left.
    pub fn mean(&self) -> Option<EmotionVector> {
        if self.samples.is_empty() {
            return None;
        }
        let n = self.samples.len() as f32;
        let mut out = EmotionVector::zero();
        for &emotion in &Emotion::ALL {
            let sum: f32 = self.samples.iter().map(|s| s.get(emotion)).sum();
            out.set(emotion, sum / n);
        }
        Some(out)
    }
}

/// Per-track smoother state for one strategy.
#[derive(Debug, Clone)]
enum SmootherState {
    Blend {
        weight: f32,
        last_output: Option<EmotionVector>,
    },
    Window(SmoothingWindow),
}

/// Combines each gated sample with the track's recent history.
#[derive(Debug, Clone)]
pub struct Smoother {
    state: SmootherState,
}

impl Smoother {
    /// Strategy parameters must already be validated by `PipelineConfig`.
    pub fn new(strategy: SmoothingStrategy) -> Self {
        let state = match strategy {
            SmoothingStrategy::WeightedBlend { weight } => SmootherState::Blend {
                weight,
                last_output: None,
            },
            SmoothingStrategy::MovingWindow { size } => {
                SmootherState::Window(SmoothingWindow::new(size))
            }
        };
        Self { state }
    }

    /// Fold the new gated sample into the track history and return the
    /// smoothed vector. With no prior history the sample is returned as-is.
    pub fn smooth(&mut self, sample: EmotionVector) -> EmotionVector {
        match &mut self.state {
            SmootherState::Blend {
                weight,
                last_output,
            } => {
                let out = match last_output {
                    None => sample,
                    Some(prev) => {
                        let w = *weight;
                        let mut blended = EmotionVector::zero();
                        for (emotion, value) in sample.iter() {
                            blended.set(emotion, value * w + prev.get(emotion) * (1.0 - w));
                        }
                        blended
                    }
                };
                *last_output = Some(out);
                out
            }
            SmootherState::Window(window) => {
                window.push(sample);
                // Window is non-empty after the push; fall back to the raw
                // sample only to satisfy the type.
                window.mean().unwrap_or(sample)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn happy(value: f32) -> EmotionVector {
        let mut v = EmotionVector::zero();
        v.set(Emotion::Happy, value);
        v
    }

    #[test]
    fn test_window_push_then_trim() {
        let mut w = SmoothingWindow::new(3);
        for value in [0.1, 0.2, 0.3, 0.4] {
            w.push(happy(value));
        }
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn test_window_mean_empty() {
        let w = SmoothingWindow::new(4);
        assert!(w.mean().is_none());
    }

    #[test]
    fn test_blend_first_sample_unchanged() {
        let mut s = Smoother::new(SmoothingStrategy::WeightedBlend { weight: 0.7 });
        assert_eq!(s.smooth(happy(0.6)), happy(0.6));
    }

    #[test]
    fn test_blend_second_sample() {
        // 0.6 then 0.8 with w = 0.7 → 0.8*0.7 + 0.6*0.3 = 0.74.
        let mut s = Smoother::new(SmoothingStrategy::WeightedBlend { weight: 0.7 });
        s.smooth(happy(0.6));
        let out = s.smooth(happy(0.8));
        assert!((out.get(Emotion::Happy) - 0.74).abs() < 1e-6);
    }

    #[test]
    fn test_blend_chains_from_previous_output() {
        let mut s = Smoother::new(SmoothingStrategy::WeightedBlend { weight: 0.5 });
        s.smooth(happy(1.0)); // out = 1.0
        s.smooth(happy(0.0)); // out = 0.5
        let out = s.smooth(happy(0.0)); // out = 0.25
        assert!((out.get(Emotion::Happy) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_window_first_sample_unchanged() {
        let mut s = Smoother::new(SmoothingStrategy::MovingWindow { size: 4 });
        assert_eq!(s.smooth(happy(0.9)), happy(0.9));
    }

    #[test]
    fn test_window_mean_of_exactly_current_contents() {
        let mut s = Smoother::new(SmoothingStrategy::MovingWindow { size: 3 });
        s.smooth(happy(0.1));
        s.smooth(happy(0.2));
        let out = s.smooth(happy(0.3));
        assert!((out.get(Emotion::Happy) - 0.2).abs() < 1e-6);

        // Fourth sample evicts the first; mean reflects [0.2, 0.3, 0.7] only.
        let out = s.smooth(happy(0.7));
        assert!((out.get(Emotion::Happy) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_window_size_one_is_identity() {
        let mut s = Smoother::new(SmoothingStrategy::MovingWindow { size: 1 });
        assert_eq!(s.smooth(happy(0.3)), happy(0.3));
        assert_eq!(s.smooth(happy(0.8)), happy(0.8));
    }

    #[test]
    fn test_window_smooths_all_keys() {
        let mut s = Smoother::new(SmoothingStrategy::MovingWindow { size: 2 });
        let mut a = EmotionVector::zero();
        a.set(Emotion::Sad, 0.4);
        a.set(Emotion::Neutral, 0.2);
        let mut b = EmotionVector::zero();
        b.set(Emotion::Sad, 0.6);
        s.smooth(a);
        let out = s.smooth(b);
        assert!((out.get(Emotion::Sad) - 0.5).abs() < 1e-6);
        assert!((out.get(Emotion::Neutral) - 0.1).abs() < 1e-6);
    }
}
