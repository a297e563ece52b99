//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

/// Command discriminator for control input
pub const CMD_ACTION: &str = "ACTION";
/// Command discriminator for an on-demand state broadcast
pub const CMD_STATE_REQUEST: &str = "STATE_REQUEST";

/// 3-component vector. On the wire this is a fixed `[x, y, z]` array of f32,
/// matching what telemetry clients already parse.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Serialize for Vec3 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.x)?;
        tuple.serialize_element(&self.y)?;
        tuple.serialize_element(&self.z)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Vec3 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let components = <[f32; 3]>::deserialize(deserializer)
            .map_err(|_| D::Error::custom("expected a [x, y, z] array of 3 floats"))?;
        Ok(Vec3::new(components[0], components[1], components[2]))
    }
}

/// Inbound control command from a client
///
/// All numeric fields default to zero when absent. Older clients omit the
/// `cmd` discriminator entirely and only ever send actions, so a missing
/// `cmd` decodes as `ACTION`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    #[serde(default = "default_cmd")]
    pub cmd: String,
    /// Steering input (-1.0 = full left, 1.0 = full right)
    #[serde(default)]
    pub steer: f32,
    /// Brake input (0.0 = released, 1.0 = full brake)
    #[serde(default)]
    pub brake: f32,
    /// Arms-up input (0.0 = down, 1.0 = up)
    #[serde(default, rename = "armsUp")]
    pub arms_up: f32,
    /// Reset input; a transition from 0 to positive triggers a reset
    #[serde(default)]
    pub reset: f32,
}

fn default_cmd() -> String {
    CMD_ACTION.to_string()
}

impl Default for ControlCommand {
    fn default() -> Self {
        Self {
            cmd: default_cmd(),
            steer: 0.0,
            brake: 0.0,
            arms_up: 0.0,
            reset: 0.0,
        }
    }
}

/// Classified command discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Control input to apply on the next tick
    Action,
    /// Client asks for one immediate state broadcast
    StateRequest,
    /// Unrecognized discriminator; dropped by the consumer
    Unknown,
}

impl ControlCommand {
    pub fn kind(&self) -> CommandKind {
        match self.cmd.as_str() {
            CMD_ACTION => CommandKind::Action,
            CMD_STATE_REQUEST => CommandKind::StateRequest,
            _ => CommandKind::Unknown,
        }
    }
}

/// Point-in-time physical state of the tracked vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    pub position: Vec3,
    /// Euler angles in degrees
    pub rotation: Vec3,
    #[serde(rename = "localVelocity")]
    pub local_velocity: Vec3,
    #[serde(rename = "localAngularVelocity")]
    pub local_angular_velocity: Vec3,
}

/// Outbound telemetry frame: state envelope plus the simulation clock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamData {
    pub state: StateData,
    /// Seconds since the simulation started
    pub timestamp: f32,
}

/// Errors decoding an inbound frame
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed command payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a telemetry frame for transmission
pub fn encode_state(data: &StreamData) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Decode an inbound control command. Accepts the payload bytes of either a
/// text or a binary frame; both carry the same JSON shape.
pub fn decode_command(payload: &[u8]) -> Result<ControlCommand, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str(text)?)
}
