//! Pipeline configuration and construction-time validation.
//!
//! A `PipelineConfig` is immutable once a pipeline is built from it; to
//! change tuning, build a new pipeline. All range checks happen here,
//! exactly once, so the per-frame path never validates anything.

use crate::types::{DerivedEmotion, Emotion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Default tuning, matching the values the detector feed was calibrated with.
const DEFAULT_CONFIDENCE_FLOOR: f32 = 0.1;
const DEFAULT_BLEND_WEIGHT: f32 = 0.7;
const DEFAULT_HYSTERESIS_FRAMES: u32 = 3;

/// Upper bound on the moving-window capacity. Deployments use 2–8; anything
/// above 32 is a configuration mistake, not a tuning choice.
pub const MAX_WINDOW_SIZE: usize = 32;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("confidence floor {0} out of range [0, 1]")]
    FloorOutOfRange(f32),
    #[error("blend weight {0} out of range (0, 1]")]
    BlendWeightOutOfRange(f32),
    #[error("window size {0} out of range [1, {MAX_WINDOW_SIZE}]")]
    WindowSizeOutOfRange(usize),
    #[error("hysteresis frames must be at least 1")]
    HysteresisZero,
    #[error("derived-emotion formula set is empty")]
    NoFormulas,
    #[error("formula for {0} has no terms")]
    EmptyFormula(DerivedEmotion),
}

/// How the temporal smoother combines the current sample with history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SmoothingStrategy {
    /// `out = new * weight + previous_output * (1 - weight)`.
    /// Needs only the last smoothed output, not a window.
    WeightedBlend { weight: f32 },
    /// Elementwise arithmetic mean over the last `size` samples.
    MovingWindow { size: usize },
}

/// One weighted contribution of a primary emotion to a derived label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormulaTerm {
    pub emotion: Emotion,
    pub coefficient: f32,
}

/// A derived emotion as a clamped linear combination of primaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFormula {
    pub target: DerivedEmotion,
    pub terms: Vec<FormulaTerm>,
}

impl DerivedFormula {
    pub fn new(target: DerivedEmotion, terms: Vec<FormulaTerm>) -> Self {
        Self { target, terms }
    }
}

/// Immutable pipeline tuning, validated once at pipeline construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-emotion values below this are zeroed before smoothing.
    pub confidence_floor: f32,
    pub smoothing: SmoothingStrategy,
    /// Consecutive frames a challenger must win argmax before the committed
    /// dominant label flips.
    pub hysteresis_frames: u32,
    pub formulas: Vec<DerivedFormula>,
    /// Rescale primary values to sum to 1 after composition. Off by default:
    /// detector values are treated as independent confidences, not a
    /// distribution.
    pub normalize_sum: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            smoothing: SmoothingStrategy::WeightedBlend {
                weight: DEFAULT_BLEND_WEIGHT,
            },
            hysteresis_frames: DEFAULT_HYSTERESIS_FRAMES,
            formulas: default_formulas(),
            normalize_sum: false,
        }
    }
}

impl PipelineConfig {
    /// Check every field; returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_floor) || self.confidence_floor.is_nan() {
            return Err(ConfigError::FloorOutOfRange(self.confidence_floor));
        }
        match self.smoothing {
            SmoothingStrategy::WeightedBlend { weight } => {
                if !(weight > 0.0 && weight <= 1.0) {
                    return Err(ConfigError::BlendWeightOutOfRange(weight));
                }
            }
            SmoothingStrategy::MovingWindow { size } => {
                if size == 0 || size > MAX_WINDOW_SIZE {
                    return Err(ConfigError::WindowSizeOutOfRange(size));
                }
            }
        }
        if self.hysteresis_frames == 0 {
            return Err(ConfigError::HysteresisZero);
        }
        if self.formulas.is_empty() {
            return Err(ConfigError::NoFormulas);
        }
        for f in &self.formulas {
            if f.terms.is_empty() {
                return Err(ConfigError::EmptyFormula(f.target));
            }
        }
        Ok(())
    }
}

/// Stock formulas: stressed = 0.6·angry + 0.5·fearful,
/// confused = 0.6·surprised + 0.4·fearful, tired = 0.5·sad + 0.5·neutral.
pub fn default_formulas() -> Vec<DerivedFormula> {
    vec![
        DerivedFormula::new(
            DerivedEmotion::Stressed,
            vec![
                FormulaTerm {
                    emotion: Emotion::Angry,
                    coefficient: 0.6,
                },
                FormulaTerm {
                    emotion: Emotion::Fearful,
                    coefficient: 0.5,
                },
            ],
        ),
        DerivedFormula::new(
            DerivedEmotion::Confused,
            vec![
                FormulaTerm {
                    emotion: Emotion::Surprised,
                    coefficient: 0.6,
                },
                FormulaTerm {
                    emotion: Emotion::Fearful,
                    coefficient: 0.4,
                },
            ],
        ),
        DerivedFormula::new(
            DerivedEmotion::Tired,
            vec![
                FormulaTerm {
                    emotion: Emotion::Sad,
                    coefficient: 0.5,
                },
                FormulaTerm {
                    emotion: Emotion::Neutral,
                    coefficient: 0.5,
                },
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_floor_out_of_range() {
        let cfg = PipelineConfig {
            confidence_floor: 1.5,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::FloorOutOfRange(1.5)));

        let cfg = PipelineConfig {
            confidence_floor: -0.1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_blend_weight_bounds() {
        let cfg = PipelineConfig {
            smoothing: SmoothingStrategy::WeightedBlend { weight: 0.0 },
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::BlendWeightOutOfRange(0.0)));

        let cfg = PipelineConfig {
            smoothing: SmoothingStrategy::WeightedBlend { weight: 1.0 },
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn test_window_size_bounds() {
        let cfg = PipelineConfig {
            smoothing: SmoothingStrategy::MovingWindow { size: 0 },
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::WindowSizeOutOfRange(0)));

        let cfg = PipelineConfig {
            smoothing: SmoothingStrategy::MovingWindow { size: MAX_WINDOW_SIZE + 1 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PipelineConfig {
            smoothing: SmoothingStrategy::MovingWindow { size: 4 },
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn test_hysteresis_zero_rejected() {
        let cfg = PipelineConfig {
            hysteresis_frames: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::HysteresisZero));
    }

    #[test]
    fn test_empty_formula_set_rejected() {
        let cfg = PipelineConfig {
            formulas: vec![],
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoFormulas));
    }

    #[test]
    fn test_formula_without_terms_rejected() {
        let cfg = PipelineConfig {
            formulas: vec![DerivedFormula::new(DerivedEmotion::Tired, vec![])],
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::EmptyFormula(DerivedEmotion::Tired))
        );
    }

    #[test]
    fn test_config_toml_round_trip() {
        let cfg = PipelineConfig {
            smoothing: SmoothingStrategy::MovingWindow { size: 6 },
            ..Default::default()
        };
        let text = toml::to_string(&cfg).unwrap();
        let back: PipelineConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
