//! nebula-gateway server entry point.
//!
//! Builds the stores, the event bus and the registry, starts the health
//! scheduler and serves the REST and WebSocket endpoints until Ctrl-C or
//! SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use nebula_gateway::api;
use nebula_gateway::app_state::AppState;
use nebula_gateway::config::{LogFormat, NebulaConfig, StorageBackend};
use nebula_gateway::domain::{ChannelPublisher, EventBus, LocalPublisher, RedisPublisher};
use nebula_gateway::persistence::Stores;
use nebula_gateway::persistence::memory::MemoryStore;
use nebula_gateway::persistence::postgres::PostgresStore;
use nebula_gateway::protocol::SlpProber;
use nebula_gateway::service::{HealthConfig, HealthScheduler, IpReputationClient, Registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = NebulaConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, backend = ?config.storage_backend, "starting nebula-gateway");

    // Build persistence layer
    let stores = match config.storage_backend {
        StorageBackend::Memory => {
            Stores::from_backend(Arc::new(MemoryStore::new(config.player_lock_timeout())))
        }
        StorageBackend::Postgres => Stores::from_backend(Arc::new(
            PostgresStore::connect(&config)
                .await
                .context("connecting to postgres")?,
        )),
    };

    // Build domain layer
    let publisher: Arc<dyn ChannelPublisher> = match config.redis_url.as_deref() {
        Some(url) => Arc::new(
            RedisPublisher::connect(url)
                .await
                .context("connecting to redis")?,
        ),
        None => Arc::new(LocalPublisher::new(config.event_bus_capacity)),
    };
    let event_bus = EventBus::new(publisher, config.stream_queue_capacity);

    // Build service layer
    let registry = Arc::new(Registry::new(stores, event_bus.clone()));
    let ip_lookup = match config.db_ip_token.as_deref() {
        Some(token) => Some(Arc::new(IpReputationClient::new(
            config.ip_lookup_endpoint.as_str(),
            token,
            std::time::Duration::from_secs(config.ip_lookup_timeout_secs),
        )?)),
        None => {
            tracing::info!("DB_IP_TOKEN not set, ip lookup disabled");
            None
        }
    };

    // Start health scheduler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = HealthScheduler::new(
        Arc::clone(&registry),
        Arc::new(SlpProber::new(config.ping_protocol_version)),
        HealthConfig {
            interval: config.ping_interval(),
            timeout: config.ping_timeout(),
            resync_cycles: config.health_resync_cycles,
        },
    );
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    // Build router
    let app_state = AppState::new(registry, ip_lookup);
    let app = api::build_app(
        app_state,
        std::time::Duration::from_secs(config.request_timeout_secs),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop background work and release the publisher
    let _ = shutdown_tx.send(true);
    if let Err(err) = scheduler_task.await {
        tracing::error!(error = %err, "health scheduler task failed");
    }
    event_bus.close().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
