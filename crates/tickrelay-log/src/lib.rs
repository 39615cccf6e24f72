//! Stream log boundary for the tickrelay server.
//!
//! The relay treats the log as an external service exposing three
//! primitives: read pending entries, remove an entry by ID, and append an
//! entry. This crate defines that boundary as the [`StreamLog`] trait and
//! provides two implementations.
//!
//! ```text
//! UpdatePoller --fetch--> StreamLog
//!                            |-- RedisStreamLog  (XREAD / XDEL / XADD)
//!                            +-- MemoryStreamLog (tests, no server)
//! ```
//!
//! # Modules
//!
//! - [`stream`] -- the [`StreamLog`] trait and the consuming `fetch`
//! - [`redis`] -- Redis streams over a `fred` connection pool
//! - [`memory`] -- in-process stream with failure injection
//! - [`backend`] -- runtime choice between the two
//! - [`entry`] -- the [`LogEntry`] record
//! - [`error`] -- shared error type

pub mod backend;
pub mod entry;
pub mod error;
pub mod memory;
pub mod redis;
pub mod stream;

// Re-export primary types for convenience.
pub use backend::LogBackend;
pub use entry::LogEntry;
pub use error::LogError;
pub use memory::MemoryStreamLog;
pub use redis::RedisStreamLog;
pub use stream::StreamLog;
