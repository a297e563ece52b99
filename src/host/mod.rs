//! Host simulation integration
//!
//! The relay is passive with respect to the host: the host calls in exactly
//! once per vehicle spawn, everything else flows through the [`Vehicle`]
//! adapter the host provides.

pub mod sim;

use tracing::info;

use crate::relay::core::RelayCore;
use crate::vehicle::Vehicle;

/// Session kind reported by the host at spawn time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Single-occupant session; the spawned vehicle becomes the tracked target
    Single,
    /// Multi-occupant session; spawns are ignored
    Multi,
}

/// Spawn hook. Binds the newly spawned vehicle as the tracked target in
/// single-occupant sessions; multi-occupant spawns are ignored so the relay
/// never streams another occupant's vehicle.
pub fn on_vehicle_spawned(core: &RelayCore, session: SessionKind, vehicle: Box<dyn Vehicle>) {
    if session != SessionKind::Single {
        info!("ignoring vehicle spawn in multi-occupant session");
        return;
    }

    let state = vehicle.state();
    info!(
        position = ?state.position,
        rotation = ?state.rotation_euler,
        local_velocity = ?state.local_velocity,
        local_angular_velocity = ?state.local_angular_velocity,
        "tracking spawned vehicle"
    );

    core.bind_target(vehicle);
}
