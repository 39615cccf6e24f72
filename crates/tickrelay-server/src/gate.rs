//! Close-once gate shared by the two pumps of a session.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Marks a session's connection as released.
///
/// Either pump closes the gate when it stops; the other pump is blocked
/// on [`closed`](Self::closed) alongside its own I/O and unwinds as soon
/// as the gate closes. Closing is idempotent and only the first caller
/// observes `true`.
#[derive(Debug, Default)]
pub struct CloseGate {
    closed: AtomicBool,
    notify: Notify,
}

impl CloseGate {
    /// Create an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate. Returns `true` for the call that actually closed it.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    /// Whether the gate has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolve once the gate is closed. Resolves immediately if it
    /// already is.
    pub async fn closed(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn only_first_close_wins() {
        let gate = CloseGate::new();
        assert!(!gate.is_closed());
        assert!(gate.close());
        assert!(!gate.close());
        assert!(gate.is_closed());
    }

    #[tokio::test]
    async fn closed_resolves_for_late_waiters() {
        let gate = CloseGate::new();
        gate.close();
        tokio::time::timeout(Duration::from_millis(10), gate.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn close_wakes_every_waiter() {
        let gate = Arc::new(CloseGate::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.closed().await })
            })
            .collect();
        tokio::task::yield_now().await;
        gate.close();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
