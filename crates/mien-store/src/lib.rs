//! mien-store — SQLite persistence for emotion tracking.
//!
//! Sessions and per-detection records, aggregate analytics for dashboard
//! surfaces, and CSV export. Single-connection, caller-serialized; the
//! daemon owns one store on its engine thread.

pub mod analytics;
pub mod export;
pub mod records;
pub mod store;

pub use analytics::{DailyStats, Summary};
pub use records::{DerivedScores, EmotionRecord, SessionRow};
pub use store::{EmotionStore, StoreError};
