use anyhow::Context;
use mien_core::{PipelineConfig, SmoothingStrategy};
use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Pipeline tuning applied to every new face-track.
    pub pipeline: PipelineConfig,
    /// Minimum interval between persisted records per track. Debouncing
    /// lives here on the caller side; the pipeline itself never rate-limits.
    pub save_interval_ms: u64,
}

impl Config {
    /// Load configuration from `MIEN_*` environment variables with defaults.
    ///
    /// `MIEN_PIPELINE_CONFIG` may point at a TOML file carrying a full
    /// [`PipelineConfig`]; individual env vars override its fields.
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("mien");

        let db_path = std::env::var("MIEN_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("emotions.db"));

        let mut pipeline = match std::env::var("MIEN_PIPELINE_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading pipeline config {path}"))?;
                toml::from_str::<PipelineConfig>(&text)
                    .with_context(|| format!("parsing pipeline config {path}"))?
            }
            Err(_) => PipelineConfig::default(),
        };

        if let Some(floor) = env_f32("MIEN_CONFIDENCE_FLOOR") {
            pipeline.confidence_floor = floor;
        }
        if let Some(frames) = env_u32("MIEN_HYSTERESIS_FRAMES") {
            pipeline.hysteresis_frames = frames;
        }
        pipeline.smoothing = smoothing_override(
            std::env::var("MIEN_SMOOTHING_STRATEGY").ok().as_deref(),
            env_f32("MIEN_SMOOTHING_WEIGHT"),
            env_usize("MIEN_SMOOTHING_WINDOW"),
            pipeline.smoothing,
        )?;

        Ok(Self {
            db_path,
            pipeline,
            save_interval_ms: env_u64("MIEN_SAVE_INTERVAL_MS").unwrap_or(1000),
        })
    }
}

/// Apply `MIEN_SMOOTHING_*` overrides on top of the configured strategy.
///
/// `MIEN_SMOOTHING_STRATEGY` selects `weighted_blend` or `moving_window`;
/// `MIEN_SMOOTHING_WEIGHT` and `MIEN_SMOOTHING_WINDOW` set the matching
/// parameter. Without a strategy override, a lone parameter adjusts the
/// current strategy in place. Range checks stay in `PipelineConfig` at
/// engine startup.
fn smoothing_override(
    strategy: Option<&str>,
    weight: Option<f32>,
    window: Option<usize>,
    current: SmoothingStrategy,
) -> anyhow::Result<SmoothingStrategy> {
    let current_weight = match current {
        SmoothingStrategy::WeightedBlend { weight } => Some(weight),
        SmoothingStrategy::MovingWindow { .. } => None,
    };
    let current_window = match current {
        SmoothingStrategy::MovingWindow { size } => Some(size),
        SmoothingStrategy::WeightedBlend { .. } => None,
    };
    match strategy {
        Some("weighted_blend") => Ok(SmoothingStrategy::WeightedBlend {
            weight: weight.or(current_weight).unwrap_or(0.7),
        }),
        Some("moving_window") => Ok(SmoothingStrategy::MovingWindow {
            size: window.or(current_window).unwrap_or(4),
        }),
        Some(other) => anyhow::bail!(
            "unknown MIEN_SMOOTHING_STRATEGY {other:?} (expected weighted_blend or moving_window)"
        ),
        None => Ok(match current {
            SmoothingStrategy::WeightedBlend { weight: w } => SmoothingStrategy::WeightedBlend {
                weight: weight.unwrap_or(w),
            },
            SmoothingStrategy::MovingWindow { size } => SmoothingStrategy::MovingWindow {
                size: window.unwrap_or(size),
            },
        }),
    }
}

fn env_f32(key: &str) -> Option<f32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
