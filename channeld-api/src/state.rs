//! State shared across requests

use channeld_core::ChannelService;
use std::sync::Arc;

/// Handles to the collaborators every handler needs
#[derive(Clone)]
pub struct AppState {
    /// Owns all channel persistence
    pub channels: Arc<dyn ChannelService>,
}

impl AppState {
    pub fn new(channels: Arc<dyn ChannelService>) -> Self {
        Self { channels }
    }
}
