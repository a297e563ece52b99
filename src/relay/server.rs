//! Relay server: listener lifecycle, routing and the fixed tick task

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::app::AppState;
use crate::config::{BroadcastMode, Config};
use crate::relay::core::RelayCore;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Server lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server is already listening")]
    AlreadyListening,
}

enum ServerState {
    Stopped,
    Listening {
        local_addr: SocketAddr,
        shutdown_tx: oneshot::Sender<()>,
        /// Tick and broadcast-timer tasks, aborted on stop.
        tasks: Vec<JoinHandle<()>>,
    },
}

/// Owns the listening socket and the background tasks driving the relay.
/// `Stopped -> Listening -> Stopped`; `start` while listening is rejected,
/// `stop` without `start` is a no-op.
pub struct RelayServer {
    config: Arc<Config>,
    core: Arc<RelayCore>,
    state: Mutex<ServerState>,
}

impl RelayServer {
    pub fn new(config: Config) -> Self {
        let core = Arc::new(RelayCore::new(config.broadcast_mode));
        Self {
            config: Arc::new(config),
            core,
            state: Mutex::new(ServerState::Stopped),
        }
    }

    pub fn core(&self) -> Arc<RelayCore> {
        self.core.clone()
    }

    /// Bind the configured address and begin accepting connections. Returns
    /// the bound address (useful when the port was 0).
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        // Check the guard before binding, so a double start reports
        // AlreadyListening instead of an address-in-use bind failure.
        if matches!(*self.state.lock(), ServerState::Listening { .. }) {
            return Err(ServerError::AlreadyListening);
        }

        let addr = self.config.server_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        // Re-check under the lock; a concurrent start may have won the race
        // while we were binding.
        let mut state = self.state.lock();
        if matches!(*state, ServerState::Listening { .. }) {
            return Err(ServerError::AlreadyListening);
        }

        let router = build_router(AppState::new(self.config.clone(), self.core.clone()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        }));
        tasks.push(spawn_tick_task(self.core.clone(), self.config.tick_rate));
        if self.config.broadcast_mode == BroadcastMode::Interval {
            tasks.push(spawn_broadcast_timer(
                self.core.clone(),
                self.config.broadcast_interval_ms,
            ));
        }

        *state = ServerState::Listening {
            local_addr,
            shutdown_tx,
            tasks,
        };

        info!(addr = %local_addr, "relay server listening");
        Ok(local_addr)
    }

    /// Address the server is currently bound to, if listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match *self.state.lock() {
            ServerState::Listening { local_addr, .. } => Some(local_addr),
            ServerState::Stopped => None,
        }
    }

    /// Close every connection, clear the registry and release the listener.
    /// Safe to call from teardown even if `start` never ran.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), ServerState::Stopped);
        match previous {
            ServerState::Listening {
                local_addr,
                shutdown_tx,
                tasks,
            } => {
                self.core.registry().clear();
                let _ = shutdown_tx.send(());
                for task in tasks {
                    task.abort();
                }
                info!(addr = %local_addr, "relay server stopped");
            }
            ServerState::Stopped => {
                debug!("stop called while not listening");
            }
        }
    }
}

/// Build the application router
fn build_router(state: AppState) -> Router {
    // Clients connect to the root or to /ws; both upgrade to the same relay.
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Tick period for a given rate. Never zero, since `interval` panics on a
/// zero period; absurdly high rates clamp to one microsecond.
fn tick_period(tick_rate: u32) -> Duration {
    Duration::from_micros((1_000_000 / u64::from(tick_rate.max(1))).max(1))
}

fn spawn_tick_task(core: Arc<RelayCore>, tick_rate: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(tick_period(tick_rate));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            core.tick();
        }
    })
}

fn spawn_broadcast_timer(core: Arc<RelayCore>, period_ms: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(Duration::from_millis(period_ms.max(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            timer.tick().await;
            core.broadcast_state();
        }
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connections: usize,
    target_bound: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        connections: state.core.registry().count(),
        target_bound: state.core.target().is_bound(),
    })
}
