use db::{D1Storage, Db, SqliteStorage, StorageError};
use server::{AppState, Clients, file_logging, routes};
use services::services::{
    config::{AppConfig, ConfigError, StorageConfig},
    discord::DiscordClient,
    discord_digest::DiscordDigestService,
    meta::MetaClient,
    scheduler::ScheduledPostService,
    twitter::TwitterClient,
    youtube::YoutubeClient,
};
use thiserror::Error;
use utils::build_info::BUILD_INFO;

#[derive(Debug, Error)]
pub enum BoardroomError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[tokio::main]
async fn main() -> Result<(), BoardroomError> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    // The guard must be held for the lifetime of the application to ensure logs are flushed
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _file_log_guard = file_logging::init_logging(&log_level);

    tracing::info!(
        version = BUILD_INFO.version,
        commit = BUILD_INFO.git_commit,
        "Starting boardroom"
    );

    let config = AppConfig::from_env()?;

    let (db, sqlite) = match &config.storage {
        StorageConfig::Sqlite {
            path,
            max_connections,
        } => {
            let storage = SqliteStorage::open(path, *max_connections).await?;
            (Db::new(storage.clone()), Some(storage))
        }
        StorageConfig::D1(d1) => {
            tracing::info!(database_id = %d1.database_id, "Using Cloudflare D1 storage");
            (Db::new(D1Storage::new(d1.clone())?), None)
        }
    };

    let clients = Clients {
        twitter: TwitterClient::new().map_err(anyhow::Error::from)?,
        youtube: YoutubeClient::new().map_err(anyhow::Error::from)?,
        meta: MetaClient::new().map_err(anyhow::Error::from)?,
        discord: DiscordClient::new().map_err(anyhow::Error::from)?,
    };

    let scheduler = ScheduledPostService::new(
        db.clone(),
        clients.twitter.clone(),
        config.scheduled_post_interval,
    )
    .spawn();
    let digest = DiscordDigestService::new(
        db.clone(),
        clients.discord.clone(),
        config.discord_digest_interval,
    )
    .spawn();

    let bind_address = config.bind_address();
    let state = AppState::new(db, config, clients);
    let app_router = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Server running on http://{local_addr}");

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    digest.abort();

    if let Some(storage) = sqlite {
        tracing::info!("Closing database connection pool...");
        storage.close().await;
        tracing::info!("Database connection pool closed");
    }

    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let terminate = async {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
            } else {
                tracing::error!("Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
