//! mien-core — Emotion signal processing pipeline.
//!
//! Turns raw per-frame emotion confidence vectors from an external detector
//! into stable, display-ready outputs: confidence gating, temporal
//! smoothing, dominant-label hysteresis, derived-emotion composition, and
//! normalization. One [`EmotionPipeline`] per face-track; pure in-memory
//! computation with no I/O.

pub mod compose;
pub mod config;
pub mod gate;
pub mod normalize;
pub mod pipeline;
pub mod smooth;
pub mod stability;
pub mod types;

pub use config::{
    default_formulas, ConfigError, DerivedFormula, FormulaTerm, PipelineConfig, SmoothingStrategy,
};
pub use pipeline::{EmotionPipeline, PipelineOutput};
pub use types::{DerivedEmotion, DerivedEmotionVector, Emotion, EmotionVector, FrameSample};
