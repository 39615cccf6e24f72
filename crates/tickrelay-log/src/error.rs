//! Error types for the stream log boundary.
//!
//! Every failure of the log service surfaces as a [`LogError`]. The
//! rendered text of an error is what a connected viewer eventually sees,
//! so variants keep their messages stable between identical failures.

/// Errors that can occur talking to the stream log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// A Redis/Dragonfly operation failed (connectivity or protocol).
    #[error("log service error: {0}")]
    Connection(#[from] fred::error::Error),

    /// The log service is unavailable for a non-Redis reason.
    #[error("log service unavailable: {0}")]
    Unavailable(String),

    /// The log connection settings are invalid.
    #[error("log configuration error: {0}")]
    Config(String),
}
