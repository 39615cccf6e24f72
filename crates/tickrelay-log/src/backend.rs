//! Runtime selection between the Redis and in-memory logs.

use std::time::Duration;

use crate::entry::LogEntry;
use crate::error::LogError;
use crate::memory::MemoryStreamLog;
use crate::redis::RedisStreamLog;
use crate::stream::StreamLog;

/// The log the server runs against, chosen from configuration.
pub enum LogBackend {
    /// A Redis/Dragonfly stream.
    Redis(RedisStreamLog),
    /// A process-local stream (no external service).
    Memory(MemoryStreamLog),
}

impl LogBackend {
    /// Short name for log output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<RedisStreamLog> for LogBackend {
    fn from(log: RedisStreamLog) -> Self {
        Self::Redis(log)
    }
}

impl From<MemoryStreamLog> for LogBackend {
    fn from(log: MemoryStreamLog) -> Self {
        Self::Memory(log)
    }
}

impl StreamLog for LogBackend {
    async fn read(&self, max_count: u64, max_wait: Duration) -> Result<Vec<LogEntry>, LogError> {
        match self {
            Self::Redis(log) => log.read(max_count, max_wait).await,
            Self::Memory(log) => log.read(max_count, max_wait).await,
        }
    }

    async fn remove(&self, id: &str) -> Result<bool, LogError> {
        match self {
            Self::Redis(log) => log.remove(id).await,
            Self::Memory(log) => log.remove(id).await,
        }
    }

    async fn append(&self, fields: Vec<(String, String)>) -> Result<String, LogError> {
        match self {
            Self::Redis(log) => log.append(fields).await,
            Self::Memory(log) => log.append(fields).await,
        }
    }

    async fn pending(&self) -> Result<u64, LogError> {
        match self {
            Self::Redis(log) => log.pending().await,
            Self::Memory(log) => log.pending().await,
        }
    }
}
