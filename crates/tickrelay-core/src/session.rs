//! Per-viewer session state that outlives individual poll cycles.
//!
//! The only memory a session carries between cycles is the last-known
//! timestamp and the text of the last error it reported. Errors are
//! reported on change only: a repeated identical failure produces no
//! frame, a different failure produces a new one, and any success clears
//! the memory so the next failure is reported again.

use chrono::{DateTime, Utc};
use tickrelay_log::LogError;

use crate::last_mod::parse_last_mod;
use crate::poller::Snapshot;

/// Edge-triggered error memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorEdge {
    last_error: Option<String>,
}

impl ErrorEdge {
    /// Record a failure. Returns the text to report, or `None` if it
    /// repeats the previously reported one.
    pub fn failed(&mut self, text: String) -> Option<String> {
        if self.last_error.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.last_error = Some(text.clone());
        Some(text)
    }

    /// Record a success, clearing the memory.
    pub fn succeeded(&mut self) {
        self.last_error = None;
    }

    /// The last reported error text, if the last cycle failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// State of one viewer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    last_known: DateTime<Utc>,
    errors: ErrorEdge,
}

impl SessionState {
    /// Create session state from the viewer's optional `lastMod` hint.
    ///
    /// The hint is informational: the log is consumed destructively, so
    /// it cannot be used to replay from a point in time.
    pub fn new(last_mod: Option<&str>) -> Self {
        Self {
            last_known: parse_last_mod(last_mod),
            errors: ErrorEdge::default(),
        }
    }

    /// Timestamp of the most recent successful cycle (or the hint).
    pub const fn last_known(&self) -> DateTime<Utc> {
        self.last_known
    }

    /// The last reported error text, if the last cycle failed.
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last_error()
    }

    /// Fold one poll result into the state and return the text frame to
    /// send, if any.
    ///
    /// Successful snapshots are always sent, including the sentinel.
    pub fn observe(&mut self, result: Result<Snapshot, LogError>) -> Option<String> {
        match result {
            Ok(snapshot) => {
                self.errors.succeeded();
                self.last_known = snapshot.observed_at;
                Some(snapshot.payload)
            }
            Err(e) => self.errors.failed(e.to_string()),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(None)
    }
}
