//! In-process [`StreamLog`] used by tests and the `memory` backend.
//!
//! Behaves like a single Redis stream: IDs are `<millis>-<seq>` and
//! strictly increasing, reads return entries oldest first, and a read
//! on an empty log waits for the next append up to the caller's window.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::entry::LogEntry;
use crate::error::LogError;
use crate::stream::StreamLog;

#[derive(Debug, Default)]
struct LogState {
    entries: VecDeque<LogEntry>,
    last_millis: u64,
    seq: u64,
}

impl LogState {
    fn next_id(&mut self) -> String {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        if now > self.last_millis {
            self.last_millis = now;
            self.seq = 0;
        } else {
            self.seq = self.seq.saturating_add(1);
        }
        format!("{}-{}", self.last_millis, self.seq)
    }
}

/// Mutex-guarded in-memory stream.
///
/// Failure injection hooks ([`set_unavailable`](Self::set_unavailable),
/// [`fail_removals`](Self::fail_removals)) let tests exercise the
/// connectivity and removal error paths without a live server.
#[derive(Debug, Default)]
pub struct MemoryStreamLog {
    state: Mutex<LogState>,
    appended: Notify,
    unavailable: Mutex<Option<String>>,
    fail_removals: AtomicBool,
}

impl MemoryStreamLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail with the given text, or restore
    /// normal operation with `None`.
    pub async fn set_unavailable(&self, reason: Option<&str>) {
        *self.unavailable.lock().await = reason.map(str::to_owned);
    }

    /// Make every subsequent removal fail (entries stay in the log).
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    async fn check_available(&self) -> Result<(), LogError> {
        match self.unavailable.lock().await.as_deref() {
            Some(reason) => Err(LogError::Unavailable(reason.to_owned())),
            None => Ok(()),
        }
    }
}

impl StreamLog for MemoryStreamLog {
    async fn read(&self, max_count: u64, max_wait: Duration) -> Result<Vec<LogEntry>, LogError> {
        let deadline = Instant::now().checked_add(max_wait).unwrap_or_else(Instant::now);
        let take = usize::try_from(max_count).unwrap_or(usize::MAX);
        loop {
            self.check_available().await?;

            // Register for the wakeup before looking, so an append that
            // lands between the check and the wait is not missed.
            let appended = self.appended.notified();
            {
                let state = self.state.lock().await;
                if !state.entries.is_empty() {
                    return Ok(state.entries.iter().take(take).cloned().collect());
                }
            }
            if tokio::time::timeout_at(deadline, appended).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn remove(&self, id: &str) -> Result<bool, LogError> {
        self.check_available().await?;
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(LogError::Unavailable(format!("removal of {id} rejected")));
        }
        let mut state = self.state.lock().await;
        let before = state.entries.len();
        state.entries.retain(|entry| entry.id != id);
        Ok(state.entries.len() < before)
    }

    async fn append(&self, fields: Vec<(String, String)>) -> Result<String, LogError> {
        self.check_available().await?;
        let id = {
            let mut state = self.state.lock().await;
            let id = state.next_id();
            state.entries.push_back(LogEntry::new(id.clone(), fields));
            id
        };
        self.appended.notify_waiters();
        Ok(id)
    }

    async fn pending(&self) -> Result<u64, LogError> {
        self.check_available().await?;
        let len = self.state.lock().await.entries.len();
        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }
}
