//! Sampling of the tracked vehicle into outbound telemetry frames

use crate::util::time::sim_time_secs;
use crate::vehicle::TargetBinding;
use crate::ws::protocol::{StateData, StreamData};

/// Read the bound vehicle into a fresh snapshot, stamped with the simulation
/// clock. `None` when no vehicle is bound.
pub fn sample(target: &TargetBinding) -> Option<StreamData> {
    target.with_vehicle(|vehicle| {
        let state = vehicle.state();
        StreamData {
            state: StateData {
                position: state.position,
                rotation: state.rotation_euler,
                local_velocity: state.local_velocity,
                local_angular_velocity: state.local_angular_velocity,
            },
            timestamp: sim_time_secs(),
        }
    })
}
