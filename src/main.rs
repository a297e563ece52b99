//! Kart Telemetry Server - WebSocket telemetry and control bridge
//!
//! Standalone entry point: runs the relay server against the built-in
//! simulation host so clients can connect, stream state and drive the kart.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kart_telemetry_server::config::Config;
use kart_telemetry_server::host::sim::SimVehicle;
use kart_telemetry_server::host::{self, SessionKind};
use kart_telemetry_server::relay::RelayServer;
use kart_telemetry_server::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize the simulation clock
    init_server_time();

    info!("Starting kart telemetry server");
    info!("Server address: {}", config.server_addr);

    let tick_rate = config.tick_rate;
    let server = Arc::new(RelayServer::new(config));
    let addr = server.start().await?;

    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    // Built-in sim host: spawn one kart and step it on the fixed tick.
    let kart = SimVehicle::new();
    host::on_vehicle_spawned(&server.core(), SessionKind::Single, Box::new(kart.clone()));

    let sim_handle = tokio::spawn(async move {
        let dt = 1.0 / tick_rate.max(1) as f32;
        let mut ticker = interval(Duration::from_secs_f32(dt));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            kart.step(dt);
        }
    });

    shutdown_signal().await;

    sim_handle.abort();
    server.stop();

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
