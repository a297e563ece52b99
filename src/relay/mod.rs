//! Real-time state/command relay

pub mod core;
pub mod queue;
pub mod registry;
pub mod sampler;
pub mod server;
pub mod translator;

pub use self::core::RelayCore;
pub use self::server::{RelayServer, ServerError};
