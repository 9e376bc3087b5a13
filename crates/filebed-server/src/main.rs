use std::sync::Arc;

use filebed_server::keys::SystemClock;
use filebed_server::{start_server, AppState, Config, Result};
use telegram_blob_relay::{AdminNotifier, BlobRelay, MemoryRelay, TelegramRelay};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

const DB_MAX_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("filebed_server=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting file bed server...");

    let config = Config::from_env()?;
    info!("Port: {}", config.port);
    info!("Public origin: {}", config.origin);
    info!("Admin path: /{}", config.admin_path);
    info!("Max upload size: {} MB", config.max_upload_bytes / (1024 * 1024));
    if config.credentials.is_none() {
        warn!("USERNAME/PASSWORD not set; admin routes will reject every request");
    }

    let pool = filebed_db::connect(&config.database_url, DB_MAX_CONNECTIONS).await?;
    filebed_db::migrate::migrate(&pool).await?;

    let (relay, notifier): (Arc<dyn BlobRelay>, Arc<dyn AdminNotifier>) = match &config.telegram {
        Some(telegram) => {
            let relay = Arc::new(TelegramRelay::new(
                &telegram.bot_token,
                &telegram.chat_id,
                config.max_upload_bytes,
                config.request_timeout,
            )?);
            (relay.clone() as Arc<dyn BlobRelay>, relay as Arc<dyn AdminNotifier>)
        }
        None => {
            warn!("TG_BOT_TOKEN/TG_CHAT_ID not set; files are kept in memory and lost on restart");
            let relay = Arc::new(MemoryRelay::new(config.max_upload_bytes));
            (relay.clone() as Arc<dyn BlobRelay>, relay as Arc<dyn AdminNotifier>)
        }
    };

    let state = Arc::new(AppState::new(
        config,
        pool,
        relay,
        Some(notifier),
        Arc::new(SystemClock),
    )?);

    start_server(state).await?;

    Ok(())
}
