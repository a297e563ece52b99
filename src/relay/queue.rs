//! Coalescing command queue between the network and tick contexts

use parking_lot::Mutex;

use crate::ws::protocol::ControlCommand;

/// Single-slot queue carrying decoded action commands to the tick loop.
///
/// Coalescing policy: only the most recent command survives, superseded ones
/// are discarded. Inputs are absolute (not deltas), so applying only the
/// latest command per tick loses nothing the vehicle would have kept.
pub struct CommandQueue {
    latest: Mutex<Option<ControlCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
        }
    }

    /// Called from network callbacks; never blocks beyond the slot lock.
    pub fn push(&self, cmd: ControlCommand) {
        *self.latest.lock() = Some(cmd);
    }

    /// Take the latest command since the last drain, if any. Called by the
    /// single tick-loop consumer.
    pub fn drain(&self) -> Option<ControlCommand> {
        self.latest.lock().take()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
