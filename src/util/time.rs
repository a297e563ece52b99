//! Simulation clock utilities

use std::sync::OnceLock;
use std::time::Instant;

/// Server start time, set once at startup
static SERVER_START: OnceLock<Instant> = OnceLock::new();

/// Initialize the simulation clock (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Seconds since startup, as the f32 timestamp carried in telemetry frames
pub fn sim_time_secs() -> f32 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs_f32())
        .unwrap_or(0.0)
}

/// Server uptime in whole seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}
