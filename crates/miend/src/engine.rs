//! Engine thread: owns the store and all per-track pipelines.
//!
//! D-Bus handlers run on the tokio runtime; the engine runs on a dedicated
//! OS thread behind an `mpsc` channel, which is what serializes all pipeline
//! and store access. One request is in flight at a time, so per-track calls
//! are never concurrent — the serialization the pipeline contract requires.

use crate::config::Config;
use mien_core::{ConfigError, Emotion, EmotionPipeline, EmotionVector, FrameSample, PipelineConfig};
use mien_store::{DailyStats, DerivedScores, EmotionRecord, EmotionStore, SessionRow, StoreError, Summary};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("pipeline config error: {0}")]
    Config(#[from] ConfigError),
    #[error("session not active: {0}")]
    SessionNotActive(String),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// One fully processed frame, as handed back to the submitting client.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFrame {
    pub session_id: String,
    pub track: u32,
    pub emotions: EmotionVector,
    pub derived: DerivedScores,
    pub dominant: Emotion,
    pub sequence: u64,
    /// Whether this frame survived the save debounce and was persisted.
    pub saved: bool,
}

/// Daemon status snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub active_sessions: usize,
    pub active_tracks: usize,
}

enum EngineRequest {
    StartSession {
        reply: oneshot::Sender<Result<SessionRow, EngineError>>,
    },
    SubmitFrame {
        session_id: String,
        track: u32,
        vector: EmotionVector,
        reply: oneshot::Sender<Result<ProcessedFrame, EngineError>>,
    },
    EndSession {
        session_id: String,
        reply: oneshot::Sender<Result<SessionRow, EngineError>>,
    },
    ListSessions {
        limit: u32,
        offset: u32,
        reply: oneshot::Sender<Result<Vec<SessionRow>, EngineError>>,
    },
    SessionRecords {
        session_id: String,
        reply: oneshot::Sender<Result<Vec<EmotionRecord>, EngineError>>,
    },
    History {
        limit: u32,
        offset: u32,
        reply: oneshot::Sender<Result<Vec<EmotionRecord>, EngineError>>,
    },
    Summary {
        days: u32,
        reply: oneshot::Sender<Result<Summary, EngineError>>,
    },
    DailyStats {
        days: u32,
        reply: oneshot::Sender<Result<Vec<DailyStats>, EngineError>>,
    },
    Distribution {
        days: u32,
        reply: oneshot::Sender<Result<Vec<(String, i64)>, EngineError>>,
    },
    ExportCsv {
        session_id: String,
        reply: oneshot::Sender<Result<String, EngineError>>,
    },
    Status {
        reply: oneshot::Sender<StatusInfo>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

macro_rules! request {
    ($self:ident, $variant:ident { $($field:ident : $value:expr),* $(,)? }) => {{
        let (reply_tx, reply_rx) = oneshot::channel();
        $self
            .tx
            .send(EngineRequest::$variant {
                $($field: $value,)*
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }};
}

impl EngineHandle {
    pub async fn start_session(&self) -> Result<SessionRow, EngineError> {
        request!(self, StartSession {})
    }

    /// Run one raw detector vector through the session's pipeline for the
    /// given face-track.
    pub async fn submit_frame(
        &self,
        session_id: String,
        track: u32,
        vector: EmotionVector,
    ) -> Result<ProcessedFrame, EngineError> {
        request!(self, SubmitFrame { session_id: session_id, track: track, vector: vector })
    }

    pub async fn end_session(&self, session_id: String) -> Result<SessionRow, EngineError> {
        request!(self, EndSession { session_id: session_id })
    }

    pub async fn list_sessions(&self, limit: u32, offset: u32) -> Result<Vec<SessionRow>, EngineError> {
        request!(self, ListSessions { limit: limit, offset: offset })
    }

    pub async fn session_records(&self, session_id: String) -> Result<Vec<EmotionRecord>, EngineError> {
        request!(self, SessionRecords { session_id: session_id })
    }

    pub async fn history(&self, limit: u32, offset: u32) -> Result<Vec<EmotionRecord>, EngineError> {
        request!(self, History { limit: limit, offset: offset })
    }

    pub async fn summary(&self, days: u32) -> Result<Summary, EngineError> {
        request!(self, Summary { days: days })
    }

    pub async fn daily_stats(&self, days: u32) -> Result<Vec<DailyStats>, EngineError> {
        request!(self, DailyStats { days: days })
    }

    pub async fn distribution(&self, days: u32) -> Result<Vec<(String, i64)>, EngineError> {
        request!(self, Distribution { days: days })
    }

    pub async fn export_csv(&self, session_id: String) -> Result<String, EngineError> {
        request!(self, ExportCsv { session_id: session_id })
    }

    pub async fn status(&self) -> Result<StatusInfo, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Status { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Per-face-track state, dropped with its session.
struct TrackState {
    pipeline: EmotionPipeline,
    next_sequence: u64,
    last_saved: Option<Instant>,
}

/// All state owned by the engine thread.
struct Engine {
    store: EmotionStore,
    pipeline_config: PipelineConfig,
    save_interval: Duration,
    /// Active sessions → per-track pipeline state. Track state never
    /// outlives its session.
    sessions: HashMap<String, HashMap<u32, TrackState>>,
}

/// Spawn the engine on a dedicated OS thread.
///
/// Opens the store and validates the pipeline config synchronously
/// (fail-fast), then enters the request loop.
pub fn spawn_engine(config: &Config) -> Result<EngineHandle, EngineError> {
    let store = EmotionStore::open(&config.db_path)?;
    config.pipeline.validate()?;
    tracing::info!(
        db = %config.db_path.display(),
        floor = config.pipeline.confidence_floor,
        hysteresis = config.pipeline.hysteresis_frames,
        save_interval_ms = config.save_interval_ms,
        "engine configured"
    );

    let mut engine = Engine {
        store,
        pipeline_config: config.pipeline.clone(),
        save_interval: Duration::from_millis(config.save_interval_ms),
        sessions: HashMap::new(),
    };

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("mien-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                engine.handle(req);
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { tx })
}

impl Engine {
    fn handle(&mut self, req: EngineRequest) {
        match req {
            EngineRequest::StartSession { reply } => {
                let result = self.start_session();
                let _ = reply.send(result);
            }
            EngineRequest::SubmitFrame {
                session_id,
                track,
                vector,
                reply,
            } => {
                let _ = reply.send(self.submit_frame(session_id, track, vector));
            }
            EngineRequest::EndSession { session_id, reply } => {
                let _ = reply.send(self.end_session(session_id));
            }
            EngineRequest::ListSessions { limit, offset, reply } => {
                let _ = reply.send(self.store.list_sessions(limit, offset).map_err(Into::into));
            }
            EngineRequest::SessionRecords { session_id, reply } => {
                let _ = reply.send(self.store.session_records(&session_id).map_err(Into::into));
            }
            EngineRequest::History { limit, offset, reply } => {
                let _ = reply.send(self.store.history(limit, offset).map_err(Into::into));
            }
            EngineRequest::Summary { days, reply } => {
                let _ = reply.send(self.store.summary(days).map_err(Into::into));
            }
            EngineRequest::DailyStats { days, reply } => {
                let _ = reply.send(self.store.daily_stats(days).map_err(Into::into));
            }
            EngineRequest::Distribution { days, reply } => {
                let _ = reply.send(self.store.distribution(days).map_err(Into::into));
            }
            EngineRequest::ExportCsv { session_id, reply } => {
                let _ = reply.send(self.store.export_session_csv(&session_id).map_err(Into::into));
            }
            EngineRequest::Status { reply } => {
                let _ = reply.send(StatusInfo {
                    active_sessions: self.sessions.len(),
                    active_tracks: self.sessions.values().map(|t| t.len()).sum(),
                });
            }
        }
    }

    fn start_session(&mut self) -> Result<SessionRow, EngineError> {
        let session = self.store.start_session()?;
        self.sessions.insert(session.session_id.clone(), HashMap::new());
        tracing::info!(session = %session.session_id, "session active");
        Ok(session)
    }

    fn submit_frame(
        &mut self,
        session_id: String,
        track: u32,
        vector: EmotionVector,
    ) -> Result<ProcessedFrame, EngineError> {
        let tracks = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| EngineError::SessionNotActive(session_id.clone()))?;

        let state = match tracks.entry(track) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                tracing::debug!(session = %session_id, track, "new face-track");
                e.insert(TrackState {
                    pipeline: EmotionPipeline::new(self.pipeline_config.clone())?,
                    next_sequence: 0,
                    last_saved: None,
                })
            }
        };

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let output = state.pipeline.process(FrameSample::new(vector, sequence));

        // Save debounce: persist at most one record per track per interval.
        let due = state
            .last_saved
            .map_or(true, |t| t.elapsed() >= self.save_interval);
        let saved = if due {
            self.store
                .save_record(&session_id, &output.vector, output.dominant)?;
            state.last_saved = Some(Instant::now());
            true
        } else {
            false
        };

        Ok(ProcessedFrame {
            session_id,
            track,
            emotions: output.vector.primary,
            derived: DerivedScores::from(&output.vector),
            dominant: output.dominant,
            sequence,
            saved,
        })
    }

    fn end_session(&mut self, session_id: String) -> Result<SessionRow, EngineError> {
        // Drop pipeline state first; a session unknown to the store may
        // still hold no state here, so removal is unconditional.
        let dropped = self.sessions.remove(&session_id);
        if let Some(tracks) = &dropped {
            tracing::info!(session = %session_id, tracks = tracks.len(), "session state dropped");
        }
        Ok(self.store.end_session(&session_id)?)
    }
}
