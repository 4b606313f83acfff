mod app;

use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};
use seatbook_core::{
    booking::BookingSession,
    config::{self, AppConfig},
    storage::{FileStorage, OccupancyStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    info!(
        data_dir = %config.data_dir.display(),
        key = %config.storage_key,
        "Starting seatbook"
    );

    let store = OccupancyStore::with_key(
        FileStorage::new(&config.data_dir),
        config.storage_key.clone(),
    );
    let session = BookingSession::new(store, config.currency.clone());

    let mut app = app::SeatbookApp::new(session);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("seatbook.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Only log to file: stdout belongs to the terminal UI.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
