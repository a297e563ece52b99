//! Tracked-vehicle capability surface and the process-wide target binding

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::ws::protocol::Vec3;

/// Physical state read from the tracked vehicle
#[derive(Debug, Clone, Copy, Default)]
pub struct VehicleState {
    pub position: Vec3,
    /// Euler angles in degrees
    pub rotation_euler: Vec3,
    pub local_velocity: Vec3,
    pub local_angular_velocity: Vec3,
}

/// Input surface written by the input translator each tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleInputs {
    pub steer_axis: f32,
    pub brake_held: bool,
    pub brake_axis: f32,
    pub arms_up_held: bool,
    pub arms_up_axis: f32,
    pub reset_triggered: bool,
}

/// Capability interface over one host vehicle.
///
/// Host versions differ in how their vehicle objects are laid out; each gets
/// a thin adapter implementing this trait so the relay logic exists once.
pub trait Vehicle: Send {
    /// Read the current physical state.
    fn state(&self) -> VehicleState;

    /// Write translated control input into the vehicle's input state.
    fn apply_inputs(&mut self, inputs: &VehicleInputs);
}

/// Single-slot holder for the currently tracked vehicle.
///
/// Set by the host's spawn hook, read by the sampler and the translator on
/// the tick context. The slot may be empty at any time; callers treat that
/// as "nothing to do", never as an error.
pub struct TargetBinding {
    slot: Mutex<Option<Box<dyn Vehicle>>>,
    /// Bumped on every set/clear so tick-side consumers can detect rebinds.
    generation: AtomicU64,
}

impl TargetBinding {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Bind a vehicle as the tracked target, replacing any previous one.
    pub fn set(&self, vehicle: Box<dyn Vehicle>) {
        *self.slot.lock() = Some(vehicle);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Drop the tracked target, if any.
    pub fn clear(&self) {
        *self.slot.lock() = None;
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn is_bound(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run `f` against the bound vehicle. Returns `None` when unbound.
    pub fn with_vehicle<R>(&self, f: impl FnOnce(&mut dyn Vehicle) -> R) -> Option<R> {
        let mut slot = self.slot.lock();
        slot.as_mut().map(|vehicle| f(vehicle.as_mut()))
    }
}

impl Default for TargetBinding {
    fn default() -> Self {
        Self::new()
    }
}
