use chrono::{DateTime, Utc};
use mien_core::{DerivedEmotion, DerivedEmotionVector, Emotion, EmotionVector};
use serde::{Deserialize, Serialize};

/// One tracking session: a contiguous run of detections for one camera
/// sitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: i64,
    /// UUID v4, the external identifier clients hold.
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_detections: i64,
}

/// Serde-facing shape for the derived scores column.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivedScores {
    pub stressed: f32,
    pub confused: f32,
    pub tired: f32,
}

impl From<&DerivedEmotionVector> for DerivedScores {
    fn from(v: &DerivedEmotionVector) -> Self {
        Self {
            stressed: v.get_derived(DerivedEmotion::Stressed),
            confused: v.get_derived(DerivedEmotion::Confused),
            tired: v.get_derived(DerivedEmotion::Tired),
        }
    }
}

impl DerivedScores {
    pub fn get(&self, emotion: DerivedEmotion) -> f32 {
        match emotion {
            DerivedEmotion::Stressed => self.stressed,
            DerivedEmotion::Confused => self.confused,
            DerivedEmotion::Tired => self.tired,
        }
    }
}

/// One persisted detection: the final pipeline output for one face on one
/// frame that survived the caller's save debounce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub id: i64,
    pub session_id: String,
    pub emotions: EmotionVector,
    pub derived: DerivedScores,
    pub dominant: Emotion,
    pub timestamp: DateTime<Utc>,
}
