//! Session-independent core of the tickrelay server.
//!
//! Everything here is transport-agnostic: the WebSocket pumps in
//! `tickrelay-server` drive these types on a timer.
//!
//! # Modules
//!
//! - [`config`] -- `tickrelay.yaml` loading, env overrides, timing contract
//! - [`poller`] -- [`UpdatePoller`]: one consuming read of the log per cycle
//! - [`session`] -- [`SessionState`]: last-known timestamp and
//!   edge-triggered error reporting
//! - [`last_mod`] -- hex nanosecond `lastMod` encoding

pub mod config;
pub mod last_mod;
pub mod poller;
pub mod session;

// Re-export primary types for convenience.
pub use config::{ConfigError, RelayConfig, SessionTimings};
pub use last_mod::{format_last_mod, parse_last_mod};
pub use poller::{Snapshot, UpdatePoller, WAITING_SENTINEL};
pub use session::{ErrorEdge, SessionState};
