//! Relay core: the hub between network callbacks and the simulation tick
//!
//! Network-context code only decodes and dispatches through [`RelayCore::handle_frame`];
//! all input application and all broadcasts happen on the tick context via
//! [`RelayCore::tick`], so vehicle input mutates on a single timeline.

use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::ws::Message;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::BroadcastMode;
use crate::relay::queue::CommandQueue;
use crate::relay::registry::ConnectionRegistry;
use crate::relay::sampler;
use crate::relay::translator::InputTranslator;
use crate::vehicle::{TargetBinding, Vehicle};
use crate::ws::protocol::{self, CommandKind, ControlCommand};

pub struct RelayCore {
    registry: ConnectionRegistry,
    commands: CommandQueue,
    /// STATE_REQUESTs received since the last tick; each one is answered with
    /// exactly one broadcast.
    pending_state_requests: AtomicUsize,
    translator: Mutex<InputTranslator>,
    target: TargetBinding,
    broadcast_mode: BroadcastMode,
}

impl RelayCore {
    pub fn new(broadcast_mode: BroadcastMode) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            commands: CommandQueue::new(),
            pending_state_requests: AtomicUsize::new(0),
            translator: Mutex::new(InputTranslator::new()),
            target: TargetBinding::new(),
            broadcast_mode,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn target(&self) -> &TargetBinding {
        &self.target
    }

    /// Bind a vehicle as the tracked target, replacing any previous one.
    pub fn bind_target(&self, vehicle: Box<dyn Vehicle>) {
        self.target.set(vehicle);
    }

    /// Network-context entry point: decode one inbound frame and dispatch
    /// it. Malformed frames are logged and dropped; the connection stays up.
    pub fn handle_frame(&self, payload: &[u8]) {
        match protocol::decode_command(payload) {
            Ok(cmd) => self.dispatch(cmd),
            Err(e) => warn!(error = %e, "dropping malformed command frame"),
        }
    }

    /// Route one decoded command. Actions are queued for the tick loop,
    /// state requests bump the pending counter, anything else is dropped.
    pub fn dispatch(&self, cmd: ControlCommand) {
        match cmd.kind() {
            CommandKind::Action => self.commands.push(cmd),
            CommandKind::StateRequest => {
                self.pending_state_requests.fetch_add(1, Ordering::Relaxed);
            }
            CommandKind::Unknown => {
                debug!(cmd = %cmd.cmd, "ignoring unknown command discriminator");
            }
        }
    }

    /// Tick-context entry point, called once per fixed simulation step.
    ///
    /// Drains the command queue into the vehicle's input state, answers
    /// pending state requests, and in every-tick mode broadcasts once.
    /// Input is only applied when a new command arrived since the last tick;
    /// stale input is never re-applied and nothing is reset on disconnect.
    pub fn tick(&self) {
        if let Some(cmd) = self.commands.drain() {
            self.translator.lock().apply(&cmd, &self.target);
        }

        let requested = self.pending_state_requests.swap(0, Ordering::Relaxed);
        for _ in 0..requested {
            self.broadcast_state();
        }

        if self.broadcast_mode == BroadcastMode::EveryTick {
            self.broadcast_state();
        }
    }

    /// Sample, encode and fan out one state frame. Silently skipped when no
    /// client is connected or no vehicle is bound; nothing is encoded in
    /// either case.
    pub fn broadcast_state(&self) {
        if self.registry.count() == 0 {
            return;
        }
        let Some(data) = sampler::sample(&self.target) else {
            return;
        };
        match protocol::encode_state(&data) {
            Ok(json) => self.registry.broadcast(Message::Text(json)),
            Err(e) => warn!(error = %e, "failed to encode state frame"),
        }
    }
}
