use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;

use config::Config;
use dbus_interface::MienService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("miend starting");

    let config = Config::from_env()?;
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data dir {}", parent.display()))?;
    }

    let engine = engine::spawn_engine(&config).context("starting engine")?;
    let service = MienService::new(engine);

    let _connection = zbus::connection::Builder::session()?
        .name("org.mien.Tracker1")?
        .serve_at("/org/mien/Tracker1", service)?
        .build()
        .await
        .context("registering on the session bus")?;

    tracing::info!("miend ready on org.mien.Tracker1");

    tokio::signal::ctrl_c().await?;
    tracing::info!("miend shutting down");

    Ok(())
}
