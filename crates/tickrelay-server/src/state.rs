//! Shared application state for the relay server.

use std::sync::Arc;

use tickrelay_core::config::FireConfig;
use tickrelay_core::{RelayConfig, SessionTimings, UpdatePoller};
use tickrelay_log::LogBackend;

use crate::error::RelayError;
use crate::pages::Pages;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. Every
/// session gets a clone of the poller; all clones consume from the same
/// log.
pub struct AppState {
    /// Poller over the shared log.
    pub poller: UpdatePoller<LogBackend>,
    /// Timing contract handed to each new session.
    pub timings: SessionTimings,
    /// Demonstration traffic settings for `/fire`.
    pub fire: FireConfig,
    /// Compiled page templates.
    pub pages: Pages,
}

impl AppState {
    /// Build the state from a connected log and the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if the session timings are invalid,
    /// or [`RelayError::Template`] if a page does not compile.
    pub fn new(log: Arc<LogBackend>, config: &RelayConfig) -> Result<Self, RelayError> {
        Ok(Self {
            poller: UpdatePoller::new(log, config.poller.clone()),
            timings: config.session.timings()?,
            fire: config.fire.clone(),
            pages: Pages::new()?,
        })
    }
}
