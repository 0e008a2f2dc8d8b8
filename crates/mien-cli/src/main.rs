use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mien_core::Emotion;
use rand::Rng;

#[derive(Parser)]
#[command(name = "mien", about = "Mien emotion tracking CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tracking sessions
    Sessions {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
    /// Show recent emotion records across all sessions
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },
    /// Show all records of one session
    Records {
        /// Session UUID
        session: String,
    },
    /// Aggregate summary over the trailing days
    Summary {
        #[arg(short, long, default_value_t = 7)]
        days: u32,
    },
    /// Per-day rollups over the trailing days
    Daily {
        #[arg(short, long, default_value_t = 14)]
        days: u32,
    },
    /// Dominant-label distribution over the trailing days
    Distribution {
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
    /// Export a session's records as CSV
    Export {
        /// Session UUID
        session: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
    /// Show daemon status
    Status,
    /// Feed synthetic detector vectors through the daemon
    Feed {
        /// Number of frames to submit
        #[arg(short, long, default_value_t = 120)]
        frames: u32,
        /// Delay between frames in milliseconds
        #[arg(short, long, default_value_t = 100)]
        interval_ms: u64,
    },
}

struct Daemon {
    proxy: zbus::Proxy<'static>,
}

impl Daemon {
    async fn connect() -> Result<Self> {
        let connection = zbus::Connection::session()
            .await
            .context("connecting to the session bus")?;
        let proxy = zbus::Proxy::new(
            &connection,
            "org.mien.Tracker1",
            "/org/mien/Tracker1",
            "org.mien.Tracker1",
        )
        .await
        .context("miend not reachable on org.mien.Tracker1")?;
        Ok(Self { proxy })
    }

    async fn call_json(&self, method: &str, body: &(impl serde::Serialize + zbus::zvariant::DynamicType)) -> Result<serde_json::Value> {
        let reply: String = self
            .proxy
            .call(method, body)
            .await
            .with_context(|| format!("calling {method}"))?;
        serde_json::from_str(&reply).with_context(|| format!("parsing {method} reply"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let daemon = Daemon::connect().await?;

    match cli.command {
        Commands::Sessions { limit } => {
            let sessions = daemon.call_json("ListSessions", &(limit, 0u32)).await?;
            for s in sessions.as_array().into_iter().flatten() {
                println!(
                    "{}  started {}  detections {}{}",
                    field_str(s, "session_id"),
                    field_str(s, "start_time"),
                    s["total_detections"],
                    if s["end_time"].is_null() { "  (open)" } else { "" },
                );
            }
        }
        Commands::History { limit, offset } => {
            let records = daemon.call_json("History", &(limit, offset)).await?;
            print_records(&records);
        }
        Commands::Records { session } => {
            let records = daemon.call_json("SessionRecords", &(session.as_str(),)).await?;
            print_records(&records);
        }
        Commands::Summary { days } => {
            let summary = daemon.call_json("Summary", &(days,)).await?;
            println!(
                "last {days} days: {} detections in {} sessions, dominant {}",
                summary["total_detections"],
                summary["session_count"],
                field_str(&summary, "dominant_emotion"),
            );
            if let Some(avg) = summary["average_emotions"].as_object() {
                for e in Emotion::ALL {
                    let value = avg.get(e.as_str()).and_then(|v| v.as_f64()).unwrap_or(0.0);
                    println!("  {:<10} {value:.3}", e.as_str());
                }
            }
        }
        Commands::Daily { days } => {
            let stats = daemon.call_json("DailyStats", &(days,)).await?;
            for day in stats.as_array().into_iter().flatten() {
                println!(
                    "{}  {:>4} detections  {:>3} sessions  dominant {}",
                    field_str(day, "date"),
                    day["detections"],
                    day["sessions"],
                    field_str(day, "dominant_emotion"),
                );
            }
        }
        Commands::Distribution { days } => {
            let dist = daemon.call_json("Distribution", &(days,)).await?;
            for entry in dist.as_array().into_iter().flatten() {
                if let (Some(label), Some(count)) = (entry[0].as_str(), entry[1].as_i64()) {
                    println!("{label:<10} {count}");
                }
            }
        }
        Commands::Export { session, output } => {
            let csv: String = daemon
                .proxy
                .call("ExportCsv", &(session.as_str(),))
                .await
                .context("calling ExportCsv")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &csv)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
        Commands::Status => {
            let status = daemon.call_json("Status", &()).await?;
            println!(
                "miend {}  active sessions {}  active tracks {}",
                field_str(&status, "version"),
                status["active_sessions"],
                status["active_tracks"],
            );
        }
        Commands::Feed { frames, interval_ms } => {
            run_feed(&daemon, frames, interval_ms).await?;
        }
    }

    Ok(())
}

fn field_str<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value[key].as_str().unwrap_or("-")
}

fn print_records(records: &serde_json::Value) {
    for r in records.as_array().into_iter().flatten() {
        println!(
            "{}  {:<10} session {}",
            field_str(r, "timestamp"),
            field_str(r, "dominant"),
            field_str(r, "session_id"),
        );
    }
}

/// Stand-in for the external detector: a mood that drifts every few seconds
/// with per-frame noise, pushed through the full daemon path.
async fn run_feed(daemon: &Daemon, frames: u32, interval_ms: u64) -> Result<()> {
    let session = daemon.call_json("StartSession", &()).await?;
    let session_id = field_str(&session, "session_id").to_string();
    println!("feeding {frames} frames into session {session_id}");

    let mut mood = Emotion::Neutral;
    for frame in 0..frames {
        if frame % 40 == 0 {
            let pick = rand::thread_rng().gen_range(0..Emotion::COUNT);
            mood = Emotion::ALL[pick];
        }

        let vector = synthetic_vector(mood);
        let reply = daemon
            .call_json("SubmitFrame", &(session_id.as_str(), 0u32, vector.to_string().as_str()))
            .await?;
        if reply["saved"].as_bool() == Some(true) {
            println!(
                "frame {frame:>4}  mood {:<10} dominant {:<10} (saved)",
                mood.as_str(),
                field_str(&reply, "dominant"),
            );
        }

        tokio::time::sleep(std::time::Duration::from_millis(interval_ms)).await;
    }

    daemon.call_json("EndSession", &(session_id.as_str(),)).await?;
    println!("session {session_id} ended");
    Ok(())
}

fn synthetic_vector(mood: Emotion) -> serde_json::Value {
    let mut rng = rand::thread_rng();
    let mut map = serde_json::Map::new();
    for e in Emotion::ALL {
        let value: f32 = if e == mood {
            rng.gen_range(0.5..0.95)
        } else {
            rng.gen_range(0.0..0.15)
        };
        map.insert(
            e.as_str().to_string(),
            serde_json::Value::from(f64::from(value)),
        );
    }
    serde_json::Value::Object(map)
}
