//! Vehicle Arena Server - headless host entry point
//!
//! Boots configuration and tracing, starts the first arena, and keeps
//! the process alive until a shutdown signal arrives. Transport
//! frontends attach to arenas through the registry in `AppState`.

use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vehicle_arena_server::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Vehicle Arena Server");
    info!(
        ai_policy = ?config.ai_policy,
        map_half_extent = config.map_half_extent,
        max_players = config.max_players,
        "Configuration loaded"
    );

    let state = AppState::new(config);
    let handle = state.spawn_arena();
    info!(arena_id = %handle.id, "First arena online");

    // Periodic occupancy report until shutdown.
    let mut report = tokio::time::interval(Duration::from_secs(30));
    report.tick().await;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = report.tick() => {
                info!(
                    arenas = state.arenas.active_arenas(),
                    players = state.arenas.total_players(),
                    "Status"
                );
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
