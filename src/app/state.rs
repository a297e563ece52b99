//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::relay::core::RelayCore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub core: Arc<RelayCore>,
}

impl AppState {
    pub fn new(config: Arc<Config>, core: Arc<RelayCore>) -> Self {
        Self { config, core }
    }
}
