//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Broadcast timing strategy, one per deployment profile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastMode {
    /// Broadcast once per inbound STATE_REQUEST (default)
    OnRequest,
    /// Broadcast on a fixed timer, independent of requests
    Interval,
    /// Broadcast on every simulation tick
    EveryTick,
}

impl BroadcastMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "on_request" => Some(Self::OnRequest),
            "interval" => Some(Self::Interval),
            "every_tick" => Some(Self::EveryTick),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Broadcast timing strategy
    pub broadcast_mode: BroadcastMode,
    /// Period of the broadcast timer in interval mode (milliseconds)
    pub broadcast_interval_ms: u64,
    /// Fixed simulation tick rate (ticks per second)
    pub tick_rate: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PORT (if set by the platform) wins over SERVER_ADDR
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let broadcast_mode = match env::var("BROADCAST_MODE") {
            Ok(value) => {
                BroadcastMode::parse(&value).ok_or(ConfigError::InvalidBroadcastMode(value))?
            }
            Err(_) => BroadcastMode::OnRequest,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            broadcast_mode,

            broadcast_interval_ms: parse_number("BROADCAST_INTERVAL_MS", 1000)?,

            tick_rate: parse_number("TICK_RATE", 50)?,
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidNumber(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid BROADCAST_MODE: {0} (expected on_request, interval or every_tick)")]
    InvalidBroadcastMode(String),

    #[error("Invalid numeric value for environment variable: {0}")]
    InvalidNumber(&'static str),
}
