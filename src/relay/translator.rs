//! Translation of decoded commands into vehicle input mutations

use crate::vehicle::{TargetBinding, VehicleInputs};
use crate::ws::protocol::ControlCommand;

/// Axis value above which a momentary button counts as held
pub const HOLD_THRESHOLD: f32 = 0.5;

/// Applies control commands to the tracked vehicle's input state.
///
/// Owns the previous reset value so the reset trigger is edge-triggered:
/// it fires only on the transition from released (`reset <= 0`) to pressed
/// (`reset > 0`), never while held. The edge state lives here rather than on
/// the vehicle, so it cannot be disturbed by the host mutating its own input
/// flags between ticks.
pub struct InputTranslator {
    reset_held: bool,
    /// Target binding generation the edge state belongs to.
    bound_generation: u64,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self {
            reset_held: false,
            bound_generation: 0,
        }
    }

    /// Apply one command to the bound vehicle. No-op when nothing is bound;
    /// the edge state does not advance on skipped calls.
    pub fn apply(&mut self, cmd: &ControlCommand, target: &TargetBinding) {
        let generation = target.generation();
        if generation != self.bound_generation {
            self.bound_generation = generation;
            self.reset_held = false;
        }

        let inputs = VehicleInputs {
            steer_axis: cmd.steer,
            brake_held: cmd.brake > HOLD_THRESHOLD,
            brake_axis: cmd.brake,
            arms_up_held: cmd.arms_up > HOLD_THRESHOLD,
            arms_up_axis: cmd.arms_up,
            reset_triggered: cmd.reset > 0.0 && !self.reset_held,
        };

        let applied = target.with_vehicle(|vehicle| vehicle.apply_inputs(&inputs));
        if applied.is_some() {
            self.reset_held = cmd.reset > 0.0;
        }
    }
}

impl Default for InputTranslator {
    fn default() -> Self {
        Self::new()
    }
}
