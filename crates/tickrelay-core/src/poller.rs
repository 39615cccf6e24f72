//! The update poller: one consuming read of the log per cycle.
//!
//! Each [`poll`](UpdatePoller::poll) claims up to `batch_size` entries and
//! renders them as `<id> => <field>` lines. When nothing was claimed the
//! payload is the [`WAITING_SENTINEL`]. The snapshot is produced fresh on
//! every cycle and is never cached.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tickrelay_log::{LogEntry, LogError, StreamLog};

use crate::config::PollerConfig;

/// Payload sent when a poll cycle claimed no entries.
pub const WAITING_SENTINEL: &str = "waiting for updates...";

/// The text produced by one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Rendered entries, or the sentinel.
    pub payload: String,
    /// When the cycle completed.
    pub observed_at: DateTime<Utc>,
}

/// Periodically invoked reader of the shared log.
///
/// Cheap to clone; every clone consumes from the same log.
pub struct UpdatePoller<L> {
    log: Arc<L>,
    config: PollerConfig,
}

impl<L> Clone for UpdatePoller<L> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            config: self.config.clone(),
        }
    }
}

impl<L: StreamLog> UpdatePoller<L> {
    /// Create a poller over `log`.
    pub const fn new(log: Arc<L>, config: PollerConfig) -> Self {
        Self { log, config }
    }

    /// The log this poller consumes from.
    pub const fn log(&self) -> &Arc<L> {
        &self.log
    }

    /// Run one poll cycle.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] only when the log could not be read. Failed
    /// removals are not errors.
    pub async fn poll(&self) -> Result<Snapshot, LogError> {
        let entries = self
            .log
            .fetch(self.config.batch_size, self.config.block())
            .await?;
        tracing::trace!(claimed = entries.len(), "Poll cycle complete");
        Ok(Snapshot {
            payload: render_entries(&entries, &self.config.field),
            observed_at: Utc::now(),
        })
    }
}

/// Render entries as `<id> => <field>\n` lines in log order.
///
/// A missing field renders as an empty value. No entries renders as the
/// [`WAITING_SENTINEL`].
pub fn render_entries(entries: &[LogEntry], field: &str) -> String {
    if entries.is_empty() {
        return WAITING_SENTINEL.to_owned();
    }
    entries.iter().fold(String::new(), |mut out, entry| {
        out.push_str(&entry.id);
        out.push_str(" => ");
        out.push_str(entry.field(field).unwrap_or_default());
        out.push('\n');
        out
    })
}
