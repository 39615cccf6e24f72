//! The [`StreamLog`] trait: the boundary between the relay and the log.
//!
//! The relay never owns the log. It reads pending entries, claims each
//! one by removing it, and (for demonstration traffic) appends new ones.
//! Consumption is destructive and global: an entry claimed by one poll
//! cycle is gone for every other session sharing the same log.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::entry::LogEntry;
use crate::error::LogError;

/// A durable, append-only log of uniquely identified entries.
///
/// Implementations only provide the primitive operations; the consuming
/// read ([`fetch`](StreamLog::fetch)) is built on top of them.
pub trait StreamLog: Send + Sync {
    /// Read up to `max_count` pending entries from the start of the log
    /// without removing them.
    ///
    /// Blocks up to `max_wait` when the log is empty. An empty result is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] when the log service cannot be reached.
    fn read(
        &self,
        max_count: u64,
        max_wait: Duration,
    ) -> impl Future<Output = Result<Vec<LogEntry>, LogError>> + Send;

    /// Remove the entry with the given ID.
    ///
    /// Returns `true` if this call removed the entry, `false` if it was
    /// already gone (claimed by a concurrent reader).
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] when the removal could not be issued.
    fn remove(&self, id: &str) -> impl Future<Output = Result<bool, LogError>> + Send;

    /// Append an entry with an auto-generated ID and return that ID.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] when the append could not be issued.
    fn append(
        &self,
        fields: Vec<(String, String)>,
    ) -> impl Future<Output = Result<String, LogError>> + Send;

    /// Number of entries currently held by the log.
    ///
    /// # Errors
    ///
    /// Returns [`LogError`] when the log service cannot be reached.
    fn pending(&self) -> impl Future<Output = Result<u64, LogError>> + Send;

    /// Read up to `max_count` entries and remove each one after reading.
    ///
    /// An entry that a concurrent reader removed first is dropped from the
    /// result, so every entry is delivered by at most one fetch. A removal
    /// that fails outright is logged and the entry is still delivered; it
    /// may then show up again in a later fetch.
    ///
    /// # Errors
    ///
    /// Only a failed [`read`](StreamLog::read) is surfaced.
    fn fetch(
        &self,
        max_count: u64,
        max_wait: Duration,
    ) -> impl Future<Output = Result<Vec<LogEntry>, LogError>> + Send {
        async move {
            let entries = self.read(max_count, max_wait).await?;
            let mut claimed = Vec::with_capacity(entries.len());
            for entry in entries {
                match self.remove(&entry.id).await {
                    Ok(true) => claimed.push(entry),
                    Ok(false) => {
                        debug!(id = %entry.id, "Entry already consumed by another poll");
                    }
                    Err(e) => {
                        warn!(id = %entry.id, error = %e, "Failed to remove log entry");
                        claimed.push(entry);
                    }
                }
            }
            Ok(claimed)
        }
    }
}
