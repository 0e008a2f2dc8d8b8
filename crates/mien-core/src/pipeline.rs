//! The assembled per-track pipeline: gate → smooth → stability → compose →
//! normalize.
//!
//! One `EmotionPipeline` per active face-track. State lives exactly as long
//! as the track; drop the instance when the track is lost. Calls for one
//! track must be externally serialized — the pipeline holds no locks and is
//! pure in-memory computation.

use crate::compose::compose;
use crate::config::{ConfigError, PipelineConfig};
use crate::gate::gate;
use crate::normalize::normalize;
use crate::smooth::Smoother;
use crate::stability::StabilityState;
use crate::types::{DerivedEmotionVector, Emotion, FrameSample};

/// One processed frame: the full derived vector plus the committed dominant
/// label.
///
/// The vector always carries the true smoothed values; only `dominant` lags
/// behind during a hysteresis run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOutput {
    pub vector: DerivedEmotionVector,
    pub dominant: Emotion,
    pub sequence: u64,
}

/// Per-face-track emotion signal processor.
pub struct EmotionPipeline {
    config: PipelineConfig,
    smoother: Smoother,
    stability: StabilityState,
}

impl EmotionPipeline {
    /// Validate the config and build fresh per-track state.
    ///
    /// Invalid configuration fails here, never mid-stream.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let smoother = Smoother::new(config.smoothing);
        let stability = StabilityState::new(config.hysteresis_frames);
        Ok(Self {
            config,
            smoother,
            stability,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Currently committed dominant label, without feeding a frame.
    pub fn dominant(&self) -> Emotion {
        self.stability.committed()
    }

    /// Run one sample through all stages.
    ///
    /// Never fails: malformed numeric input was already clamped when the
    /// sample's vector was constructed.
    pub fn process(&mut self, sample: FrameSample) -> PipelineOutput {
        let gated = gate(&sample.vector, self.config.confidence_floor);
        let smoothed = self.smoother.smooth(gated);
        let dominant = self.stability.observe(&smoothed);
        // Derived labels are composed from the smoothed scores; sum-to-one
        // rescaling afterwards touches primaries only.
        let composed = compose(&smoothed, &self.config.formulas);
        let primary = normalize(&composed.primary, self.config.normalize_sum);
        let vector = composed.with_primary(primary);
        PipelineOutput {
            vector,
            dominant,
            sequence: sample.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, SmoothingStrategy};
    use crate::types::{DerivedEmotion, EmotionVector};

    fn sample(seq: u64, entries: &[(Emotion, f32)]) -> FrameSample {
        let mut v = EmotionVector::zero();
        for &(e, value) in entries {
            v.set(e, value);
        }
        FrameSample::new(v, seq)
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let cfg = PipelineConfig {
            confidence_floor: 2.0,
            ..Default::default()
        };
        assert_eq!(
            EmotionPipeline::new(cfg).err(),
            Some(ConfigError::FloorOutOfRange(2.0))
        );
    }

    #[test]
    fn test_single_frame_end_to_end() {
        // Floor 0.1, window 1, hysteresis 1: output mirrors the gated input.
        let cfg = PipelineConfig {
            confidence_floor: 0.1,
            smoothing: SmoothingStrategy::MovingWindow { size: 1 },
            hysteresis_frames: 1,
            ..Default::default()
        };
        let mut p = EmotionPipeline::new(cfg).unwrap();
        let out = p.process(sample(
            0,
            &[
                (Emotion::Happy, 0.9),
                (Emotion::Sad, 0.05),
                (Emotion::Surprised, 0.02),
                (Emotion::Neutral, 0.1),
            ],
        ));
        assert_eq!(out.vector.primary.get(Emotion::Happy), 0.9);
        assert_eq!(out.vector.primary.get(Emotion::Sad), 0.0);
        assert_eq!(out.vector.primary.get(Emotion::Surprised), 0.0);
        assert_eq!(out.vector.primary.get(Emotion::Neutral), 0.1);
        assert_eq!(out.dominant, Emotion::Happy);
        assert_eq!(out.sequence, 0);
    }

    #[test]
    fn test_weighted_blend_end_to_end() {
        // 0.6 then 0.8 with w = 0.7 → 0.8*0.7 + 0.6*0.3 = 0.74.
        let cfg = PipelineConfig {
            confidence_floor: 0.0,
            smoothing: SmoothingStrategy::WeightedBlend { weight: 0.7 },
            hysteresis_frames: 1,
            ..Default::default()
        };
        let mut p = EmotionPipeline::new(cfg).unwrap();
        p.process(sample(0, &[(Emotion::Happy, 0.6)]));
        let out = p.process(sample(1, &[(Emotion::Happy, 0.8)]));
        assert!((out.vector.primary.get(Emotion::Happy) - 0.74).abs() < 1e-6);
    }

    #[test]
    fn test_dominant_label_lags_vector() {
        // Hysteresis 3 starting from neutral: the label flips exactly on the
        // third angry frame, while the vector reports angry scores from the
        // first frame on.
        let cfg = PipelineConfig {
            confidence_floor: 0.0,
            smoothing: SmoothingStrategy::MovingWindow { size: 1 },
            hysteresis_frames: 3,
            ..Default::default()
        };
        let mut p = EmotionPipeline::new(cfg).unwrap();
        let angry = [(Emotion::Angry, 0.8), (Emotion::Neutral, 0.1)];

        let out = p.process(sample(0, &angry));
        assert_eq!(out.dominant, Emotion::Neutral);
        assert_eq!(out.vector.primary.get(Emotion::Angry), 0.8);

        assert_eq!(p.process(sample(1, &angry)).dominant, Emotion::Neutral);
        assert_eq!(p.process(sample(2, &angry)).dominant, Emotion::Angry);
    }

    #[test]
    fn test_derived_values_present() {
        let cfg = PipelineConfig {
            confidence_floor: 0.0,
            smoothing: SmoothingStrategy::MovingWindow { size: 1 },
            hysteresis_frames: 1,
            ..Default::default()
        };
        let mut p = EmotionPipeline::new(cfg).unwrap();
        let out = p.process(sample(0, &[(Emotion::Angry, 1.0), (Emotion::Fearful, 1.0)]));
        // stressed = 1.0*0.6 + 1.0*0.5, clamped
        assert_eq!(out.vector.get_derived(DerivedEmotion::Stressed), 1.0);
    }

    #[test]
    fn test_normalize_sum_applies_to_primaries_only() {
        let cfg = PipelineConfig {
            confidence_floor: 0.0,
            smoothing: SmoothingStrategy::MovingWindow { size: 1 },
            hysteresis_frames: 1,
            normalize_sum: true,
            ..Default::default()
        };
        let mut p = EmotionPipeline::new(cfg).unwrap();
        let out = p.process(sample(0, &[(Emotion::Sad, 0.2), (Emotion::Neutral, 0.2)]));
        assert!((out.vector.primary.sum() - 1.0).abs() < 1e-6);
        assert!((out.vector.primary.get(Emotion::Sad) - 0.5).abs() < 1e-6);
        // tired composed from pre-rescale scores: 0.2*0.5 + 0.2*0.5
        assert!((out.vector.get_derived(DerivedEmotion::Tired) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_stays_neutral() {
        let cfg = PipelineConfig {
            hysteresis_frames: 1,
            ..Default::default()
        };
        let mut p = EmotionPipeline::new(cfg).unwrap();
        let out = p.process(sample(0, &[]));
        assert_eq!(out.dominant, Emotion::Neutral);
        assert_eq!(out.vector.primary, EmotionVector::zero());
    }

    #[test]
    fn test_separate_tracks_do_not_share_state() {
        let cfg = PipelineConfig {
            confidence_floor: 0.0,
            smoothing: SmoothingStrategy::WeightedBlend { weight: 0.5 },
            hysteresis_frames: 1,
            ..Default::default()
        };
        let mut a = EmotionPipeline::new(cfg.clone()).unwrap();
        let mut b = EmotionPipeline::new(cfg).unwrap();
        a.process(sample(0, &[(Emotion::Happy, 1.0)]));
        // Track b has no history: first sample passes through unsmoothed.
        let out = b.process(sample(0, &[(Emotion::Happy, 0.4)]));
        assert_eq!(out.vector.primary.get(Emotion::Happy), 0.4);
    }
}
