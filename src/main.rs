use std::sync::Arc;

use anyhow::Result;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use switchbot_panel::{
    api::{self, AppState},
    config::Config,
    control::CommandService,
    poller::StatusPoller,
    status_cache::StatusCache,
    switchbot::SwitchBotClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env()?;
    if !config.switchbot_proxy_url.is_empty() {
        info!(proxy = %config.switchbot_proxy_url, "Forwarding SwitchBot requests through proxy");
    }

    // Shared in-memory cache of the device list and latest statuses
    let cache = StatusCache::new();

    // Build shared SwitchBot client
    let client = SwitchBotClient::new(config.client_settings())?;

    // Spawn status-polling task
    {
        let poller = StatusPoller::new(
            client.clone(),
            cache.clone(),
            config.displayed_device_ids.clone(),
            config.poll_interval_secs,
        );
        if let Err(e) = poller.refresh_devices().await {
            warn!(error = %e, "Initial device listing failed; will retry on next poll");
        }
        tokio::spawn(poller.run());
    }

    let state = AppState {
        commands: CommandService::new(client.clone(), cache.clone(), config.command_refresh_delay()),
        client,
        cache,
        displayed: Arc::new(config.displayed_device_ids.clone()),
    };

    // Start HTTP server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
