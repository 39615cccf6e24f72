//! Redis-streams (or `Dragonfly`) backed [`StreamLog`].
//!
//! The log is a single stream key. Operations map onto stream commands:
//!
//! | Operation | Command |
//! |-----------|---------|
//! | `read` | `XREAD COUNT n BLOCK ms STREAMS <key> 0` |
//! | `remove` | `XDEL <key> <id>` |
//! | `append` | `XADD <key> * field value ...` |
//! | `pending` | `XLEN <key>` |
//!
//! `XREAD ... BLOCK` parks the connection it runs on, so the log holds a
//! small pool of clients and every command picks the next one in turn.

use std::time::Duration;

use fred::prelude::*;
use fred::types::streams::XReadResponse;

use crate::entry::LogEntry;
use crate::error::LogError;
use crate::stream::StreamLog;

/// Connection pool to a Redis-compatible server holding the stream.
#[derive(Clone)]
pub struct RedisStreamLog {
    pool: Pool,
    stream_key: String,
}

impl RedisStreamLog {
    /// Connect to the server at `url` with `pool_size` connections.
    ///
    /// The URL follows the Redis URL scheme: `redis://host:port` or
    /// `redis://host:port/db`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Config`] if the URL cannot be parsed or the pool
    /// size is zero. Returns [`LogError::Connection`] if the connection
    /// fails.
    pub async fn connect(
        url: &str,
        pool_size: usize,
        stream_key: impl Into<String>,
    ) -> Result<Self, LogError> {
        if pool_size == 0 {
            return Err(LogError::Config(String::from("pool size must be at least 1")));
        }
        let config = Config::from_url(url)
            .map_err(|e| LogError::Config(format!("Invalid log URL: {e}")))?;

        let pool = Builder::from_config(config).build_pool(pool_size)?;
        pool.init().await?;

        let stream_key = stream_key.into();
        tracing::info!(url, pool_size, stream_key, "Connected to stream log");
        Ok(Self { pool, stream_key })
    }

    /// Delete the whole stream.
    ///
    /// **WARNING:** This drops every pending entry. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Connection`] if the delete fails.
    pub async fn clear(&self) -> Result<(), LogError> {
        let _: u32 = self.pool.next().del(self.stream_key.as_str()).await?;
        Ok(())
    }
}

/// Convert a wait window to the `BLOCK` argument. A zero window means
/// "do not block"; `BLOCK 0` would mean "block forever".
fn block_millis(max_wait: Duration) -> Option<u64> {
    let ms = u64::try_from(max_wait.as_millis()).unwrap_or(u64::MAX);
    (ms > 0).then_some(ms)
}

impl StreamLog for RedisStreamLog {
    async fn read(&self, max_count: u64, max_wait: Duration) -> Result<Vec<LogEntry>, LogError> {
        let response: XReadResponse<String, String, String, String> = self
            .pool
            .next()
            .xread_map(
                Some(max_count),
                block_millis(max_wait),
                self.stream_key.as_str(),
                "0",
            )
            .await?;

        let entries = response
            .into_values()
            .flatten()
            .map(|(id, fields)| LogEntry::new(id, fields))
            .collect();
        Ok(entries)
    }

    async fn remove(&self, id: &str) -> Result<bool, LogError> {
        let removed: u64 = self
            .pool
            .next()
            .xdel(self.stream_key.as_str(), id)
            .await?;
        Ok(removed > 0)
    }

    async fn append(&self, fields: Vec<(String, String)>) -> Result<String, LogError> {
        let id: String = self
            .pool
            .next()
            .xadd(self.stream_key.as_str(), false, None, "*", fields)
            .await?;
        Ok(id)
    }

    async fn pending(&self) -> Result<u64, LogError> {
        let len: u64 = self.pool.next().xlen(self.stream_key.as_str()).await?;
        Ok(len)
    }
}
