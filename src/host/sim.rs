//! Built-in simulation host
//!
//! A deliberately small kinematic kart so the standalone binary has a live
//! vehicle to stream and steer. Real deployments replace this with an
//! adapter over the host engine's vehicle object.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::vehicle::{Vehicle, VehicleInputs, VehicleState};
use crate::ws::protocol::Vec3;

const MAX_SPEED: f32 = 30.0;
const ACCELERATION: f32 = 8.0;
const BRAKE_DECELERATION: f32 = 20.0;
/// Yaw rate at full steer, degrees per second
const STEER_YAW_RATE: f32 = 90.0;

struct SimState {
    state: VehicleState,
    inputs: VehicleInputs,
    speed: f32,
}

/// Handle to the simulated kart. Clones share the same underlying state, so
/// the relay can own one handle as the bound target while the sim loop steps
/// the vehicle through another.
#[derive(Clone)]
pub struct SimVehicle {
    shared: Arc<Mutex<SimState>>,
}

impl SimVehicle {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(SimState {
                state: VehicleState::default(),
                inputs: VehicleInputs::default(),
                speed: 0.0,
            })),
        }
    }

    /// Advance the kart by one fixed step. The kart rolls forward on its
    /// own, steer yaws it, brake slows it, reset puts it back at the origin.
    pub fn step(&self, dt: f32) {
        let mut sim = self.shared.lock();

        if sim.inputs.reset_triggered {
            sim.state = VehicleState::default();
            sim.speed = 0.0;
            // The trigger is momentary; consume it so a held reset does not
            // pin the kart at the origin.
            sim.inputs.reset_triggered = false;
            return;
        }

        let steer = sim.inputs.steer_axis.clamp(-1.0, 1.0);
        let yaw_rate = steer * STEER_YAW_RATE;
        sim.state.rotation_euler.y = (sim.state.rotation_euler.y + yaw_rate * dt).rem_euclid(360.0);

        let accel = if sim.inputs.brake_held {
            -BRAKE_DECELERATION
        } else {
            ACCELERATION
        };
        sim.speed = (sim.speed + accel * dt).clamp(0.0, MAX_SPEED);

        let yaw_rad = sim.state.rotation_euler.y.to_radians();
        let speed = sim.speed;
        sim.state.position.x += yaw_rad.sin() * speed * dt;
        sim.state.position.z += yaw_rad.cos() * speed * dt;

        sim.state.local_velocity = Vec3::new(0.0, 0.0, speed);
        sim.state.local_angular_velocity = Vec3::new(0.0, yaw_rate.to_radians(), 0.0);
    }
}

impl Default for SimVehicle {
    fn default() -> Self {
        Self::new()
    }
}

impl Vehicle for SimVehicle {
    fn state(&self) -> VehicleState {
        self.shared.lock().state
    }

    fn apply_inputs(&mut self, inputs: &VehicleInputs) {
        self.shared.lock().inputs = *inputs;
    }
}
