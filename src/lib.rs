//! Kart telemetry server
//!
//! Streams the tracked vehicle's physical state over WebSocket and applies
//! inbound control commands on the simulation's fixed tick. The relay core
//! is host-agnostic: hosts provide a [`vehicle::Vehicle`] adapter and call
//! [`host::on_vehicle_spawned`] when a vehicle appears.

pub mod app;
pub mod config;
pub mod host;
pub mod relay;
pub mod util;
pub mod vehicle;
pub mod ws;
