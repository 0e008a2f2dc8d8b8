//! Aggregate queries over stored records — summary, distribution, daily
//! stats. These back the dashboard surfaces; the heavy per-record folding
//! happens here, not in clients.

use crate::store::{EmotionStore, StoreError};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use mien_core::{Emotion, EmotionVector};
use serde::Serialize;

/// Averages and totals over a trailing date range.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_detections: i64,
    pub session_count: i64,
    /// Per-emotion arithmetic mean over all records in range; zero vector
    /// when the range is empty.
    pub average_emotions: EmotionVector,
    /// Dominant of the averages; `neutral` when the range is empty.
    pub dominant_emotion: Emotion,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Per-day rollup for the daily dashboard strip.
#[derive(Debug, Clone, Serialize)]
pub struct DailyStats {
    /// ISO date (UTC).
    pub date: String,
    pub detections: i64,
    pub sessions: i64,
    /// Most frequent per-record dominant label; `neutral` on empty days.
    pub dominant_emotion: Emotion,
    /// Mean of each record's highest primary score.
    pub average_confidence: f32,
}

impl EmotionStore {
    /// Summary over the last `days` days (ending now).
    pub fn summary(&self, days: u32) -> Result<Summary, StoreError> {
        let end = Utc::now();
        let start = end - Duration::days(i64::from(days));

        let records = self.records_between(start, end)?;
        let session_count = self.count_sessions_between(start, end)?;

        let mut average_emotions = EmotionVector::zero();
        let mut dominant_emotion = Emotion::Neutral;
        if !records.is_empty() {
            let n = records.len() as f32;
            for &emotion in &Emotion::ALL {
                let sum: f32 = records.iter().map(|r| r.emotions.get(emotion)).sum();
                average_emotions.set(emotion, sum / n);
            }
            if average_emotions.sum() > 0.0 {
                dominant_emotion = average_emotions.dominant(None);
            }
        }

        Ok(Summary {
            total_detections: records.len() as i64,
            session_count,
            average_emotions,
            dominant_emotion,
            start,
            end,
        })
    }

    /// Count of records per dominant label over the last `days` days,
    /// most frequent first.
    pub fn distribution(&self, days: u32) -> Result<Vec<(String, i64)>, StoreError> {
        let end = Utc::now();
        let start = end - Duration::days(i64::from(days));
        self.dominant_counts_between(start, end)
    }

    /// One entry per calendar day (UTC) for the last `days` days, oldest
    /// first, including empty days.
    pub fn daily_stats(&self, days: u32) -> Result<Vec<DailyStats>, StoreError> {
        let today = Utc::now().date_naive();
        let mut out = Vec::with_capacity(days as usize + 1);

        for offset in (0..=i64::from(days)).rev() {
            let date = today - Duration::days(offset);
            let day_start = date
                .and_time(NaiveTime::MIN)
                .and_utc();
            let day_end = day_start + Duration::days(1);

            let records = self.records_between(day_start, day_end)?;
            let sessions = self.count_sessions_between(day_start, day_end)?;

            let mut dominant_counts = [0i64; Emotion::COUNT];
            let mut confidence_sum = 0.0f32;
            for record in &records {
                dominant_counts[record.dominant.index()] += 1;
                confidence_sum += record.emotions.get(record.emotions.dominant(None));
            }

            let dominant_emotion = if records.is_empty() {
                Emotion::Neutral
            } else {
                // First in declared order wins ties, same rule as the
                // pipeline's argmax.
                let mut best = Emotion::ALL[0];
                for &e in &Emotion::ALL[1..] {
                    if dominant_counts[e.index()] > dominant_counts[best.index()] {
                        best = e;
                    }
                }
                best
            };
            let average_confidence = if records.is_empty() {
                0.0
            } else {
                confidence_sum / records.len() as f32
            };

            out.push(DailyStats {
                date: date.to_string(),
                detections: records.len() as i64,
                sessions,
                dominant_emotion,
                average_confidence,
            });
        }
        Ok(out)
    }
}
