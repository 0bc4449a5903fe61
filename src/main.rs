//! Chat relay server binary.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chat_relay::adapters::{
    relay_router, HttpPersistenceClient, HttpPersistenceConfig, InMemoryMessageStore,
    ModerationListRefresher, RelayState, StaticModerationLists, SystemClock,
};
use chat_relay::application::{HubSettings, RoomHub};
use chat_relay::config::AppConfig;
use chat_relay::ports::{MessageStore, ModerationListSource, PersistenceError};

/// Messages kept when running without a REST backend.
const IN_MEMORY_HISTORY: usize = 1000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }
    let addr = config.server.socket_addr()?;

    let (store, lists) = persistence(&config)?;
    let hub = Arc::new(RoomHub::new(
        store,
        Arc::new(SystemClock),
        HubSettings {
            policy: config.moderation.policy(),
            max_message_chars: config.moderation.max_message_chars,
            outbound_buffer: config.realtime.outbound_buffer,
        },
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = ModerationListRefresher::new(
        lists,
        Arc::clone(hub.patterns()),
        Arc::clone(hub.highlights()),
        config.moderation.reload_interval(),
    );
    let refresher_task = tokio::spawn(async move { refresher.run(shutdown_rx).await });

    let app = relay_router(
        RelayState::new(hub),
        &config.server.cors_origins_list(),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Chat relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = refresher_task.await;
    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// `RUST_LOG` wins over `server.log_level`. JSON output in production.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn persistence(
    config: &AppConfig,
) -> Result<(Arc<dyn MessageStore>, Arc<dyn ModerationListSource>), PersistenceError> {
    match config.persistence.base_url() {
        Some(base_url) => {
            let mut client_config =
                HttpPersistenceConfig::new(base_url).with_timeout(config.persistence.timeout());
            if let Some(token) = config.persistence.api_token() {
                client_config = client_config.with_api_token(token);
            }
            let client = Arc::new(HttpPersistenceClient::new(client_config)?);
            tracing::info!(base_url, "Using REST persistence backend");

            let store: Arc<dyn MessageStore> = client.clone();
            let lists: Arc<dyn ModerationListSource> = client;
            Ok((store, lists))
        }
        None => {
            tracing::warn!("No persistence URL configured, messages are kept in memory only");
            let store: Arc<dyn MessageStore> =
                Arc::new(InMemoryMessageStore::bounded(IN_MEMORY_HISTORY));
            let lists: Arc<dyn ModerationListSource> = Arc::new(StaticModerationLists::from_csv(
                config.moderation.banned_words.as_deref().unwrap_or_default(),
            ));
            Ok((store, lists))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
