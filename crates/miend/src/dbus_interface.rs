//! D-Bus interface for the Mien tracking daemon.
//!
//! Bus name: org.mien.Tracker1
//! Object path: /org/mien/Tracker1
//!
//! Structured payloads cross the bus as JSON strings: raw detector vectors
//! in, processed frames / rows / summaries out.

use crate::engine::{EngineError, EngineHandle};
use mien_core::EmotionVector;
use zbus::interface;

pub struct MienService {
    engine: EngineHandle,
}

impl MienService {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }
}

fn to_fdo(err: EngineError) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(err.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

#[interface(name = "org.mien.Tracker1")]
impl MienService {
    /// Start a tracking session; returns the session row as JSON.
    async fn start_session(&self) -> zbus::fdo::Result<String> {
        let session = self.engine.start_session().await.map_err(to_fdo)?;
        tracing::info!(session = %session.session_id, "session started over dbus");
        to_json(&session)
    }

    /// Feed one raw detector vector for a face-track; returns the processed
    /// frame as JSON. Unknown emotion keys are ignored, missing keys are 0.
    async fn submit_frame(
        &self,
        session_id: &str,
        track: u32,
        vector_json: &str,
    ) -> zbus::fdo::Result<String> {
        let vector: EmotionVector = serde_json::from_str(vector_json)
            .map_err(|e| zbus::fdo::Error::InvalidArgs(format!("bad emotion vector: {e}")))?;
        let frame = self
            .engine
            .submit_frame(session_id.to_string(), track, vector)
            .await
            .map_err(to_fdo)?;
        to_json(&frame)
    }

    /// End a session and discard its per-track pipeline state.
    async fn end_session(&self, session_id: &str) -> zbus::fdo::Result<String> {
        let session = self
            .engine
            .end_session(session_id.to_string())
            .await
            .map_err(to_fdo)?;
        tracing::info!(session = %session.session_id, "session ended over dbus");
        to_json(&session)
    }

    /// Sessions, newest first, as a JSON array.
    async fn list_sessions(&self, limit: u32, offset: u32) -> zbus::fdo::Result<String> {
        let sessions = self.engine.list_sessions(limit, offset).await.map_err(to_fdo)?;
        to_json(&sessions)
    }

    /// All records of one session, oldest first, as a JSON array.
    async fn session_records(&self, session_id: &str) -> zbus::fdo::Result<String> {
        let records = self
            .engine
            .session_records(session_id.to_string())
            .await
            .map_err(to_fdo)?;
        to_json(&records)
    }

    /// Records across sessions, newest first, as a JSON array.
    async fn history(&self, limit: u32, offset: u32) -> zbus::fdo::Result<String> {
        let records = self.engine.history(limit, offset).await.map_err(to_fdo)?;
        to_json(&records)
    }

    /// Aggregate summary over the trailing `days` days.
    async fn summary(&self, days: u32) -> zbus::fdo::Result<String> {
        let summary = self.engine.summary(days).await.map_err(to_fdo)?;
        to_json(&summary)
    }

    /// Per-day rollups over the trailing `days` days.
    async fn daily_stats(&self, days: u32) -> zbus::fdo::Result<String> {
        let stats = self.engine.daily_stats(days).await.map_err(to_fdo)?;
        to_json(&stats)
    }

    /// Dominant-label counts over the trailing `days` days.
    async fn distribution(&self, days: u32) -> zbus::fdo::Result<String> {
        let dist = self.engine.distribution(days).await.map_err(to_fdo)?;
        to_json(&dist)
    }

    /// A session's records rendered as CSV.
    async fn export_csv(&self, session_id: &str) -> zbus::fdo::Result<String> {
        self.engine
            .export_csv(session_id.to_string())
            .await
            .map_err(to_fdo)
    }

    /// Daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let status = self.engine.status().await.map_err(to_fdo)?;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "active_sessions": status.active_sessions,
            "active_tracks": status.active_tracks,
        })
        .to_string())
    }
}
