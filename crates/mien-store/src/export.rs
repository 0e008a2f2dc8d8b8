//! CSV export of a session's records.
//!
//! Fixed column order: timestamp, dominant, the primary emotions in
//! `Emotion::ALL` order, then the derived labels. Values are plain decimal
//! floats; no field ever needs quoting.

use crate::store::{fmt_ts, EmotionStore, StoreError};
use mien_core::{DerivedEmotion, Emotion};
use std::fmt::Write;

impl EmotionStore {
    /// Render all records of one session as CSV, oldest first.
    pub fn export_session_csv(&self, session_id: &str) -> Result<String, StoreError> {
        let records = self.session_records(session_id)?;

        let mut out = String::from("timestamp,dominant");
        for e in Emotion::ALL {
            out.push(',');
            out.push_str(e.as_str());
        }
        for e in DerivedEmotion::ALL {
            out.push(',');
            out.push_str(e.as_str());
        }
        out.push('\n');

        for record in records {
            let _ = write!(out, "{},{}", fmt_ts(record.timestamp), record.dominant);
            for e in Emotion::ALL {
                let _ = write!(out, ",{}", record.emotions.get(e));
            }
            for e in DerivedEmotion::ALL {
                let _ = write!(out, ",{}", record.derived.get(e));
            }
            out.push('\n');
        }
        Ok(out)
    }
}
