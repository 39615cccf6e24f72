//! Configuration loading and typed config structures for the relay.
//!
//! Configuration comes from an optional `tickrelay.yaml` file. Every
//! section and field has a default, so an absent file or a partial file
//! is valid. Environment variables override the log and listen addresses
//! after the file is read, and the result is validated once at startup.
//!
//! # Environment overrides
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `LOG_URL` | Full log URL (`redis://host:port/db`), wins over `LOG_HOST` |
//! | `LOG_HOST` | `host` or `host:port` of the log service (port defaults to 6379) |
//! | `RELAY_ADDR` | `host:port` the HTTP server listens on |

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Default port of the log service when `LOG_HOST` names only a host.
const DEFAULT_LOG_PORT: u16 = 6379;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of range or inconsistent with another value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level relay configuration.
///
/// Mirrors the structure of `tickrelay.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// HTTP listen address.
    #[serde(default)]
    pub http: HttpConfig,

    /// Log service connection.
    #[serde(default)]
    pub log: LogConfig,

    /// Per-connection timing contract.
    #[serde(default)]
    pub session: SessionConfig,

    /// What each poll cycle reads.
    #[serde(default)]
    pub poller: PollerConfig,

    /// Demonstration traffic generated by `/fire`.
    #[serde(default)]
    pub fire: FireConfig,
}

impl RelayConfig {
    /// Load configuration from a YAML file, apply environment overrides,
    /// and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or value is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override addresses from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `RELAY_ADDR` is malformed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override addresses from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `RELAY_ADDR` is malformed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LOG_URL").filter(|v| !v.is_empty()) {
            self.log.url = url;
        } else if let Some(host) = lookup("LOG_HOST").filter(|v| !v.is_empty()) {
            self.log.url = if host.contains(':') {
                format!("redis://{host}")
            } else {
                format!("redis://{host}:{DEFAULT_LOG_PORT}")
            };
        }

        if let Some(addr) = lookup("RELAY_ADDR").filter(|v| !v.is_empty()) {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| ConfigError::Invalid(format!("RELAY_ADDR has no port: {addr}")))?;
            self.http.port = port
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("invalid RELAY_ADDR port {port}: {e}")))?;
            if !host.is_empty() {
                host.clone_into(&mut self.http.host);
            }
        }
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.timings()?;
        if self.poller.batch_size == 0 {
            return Err(ConfigError::Invalid(String::from(
                "poller.batch_size must be at least 1",
            )));
        }
        if self.poller.stream_key.is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "poller.stream_key must not be empty",
            )));
        }
        if self.log.backend == LogBackendKind::Redis && self.log.pool_size == 0 {
            return Err(ConfigError::Invalid(String::from(
                "log.pool_size must be at least 1",
            )));
        }
        Ok(())
    }
}

/// HTTP listen address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

/// Which log implementation to run against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogBackendKind {
    /// A Redis-compatible server holding the stream.
    #[default]
    Redis,
    /// A process-local stream; nothing external is contacted.
    Memory,
}

/// Log service connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: LogBackendKind,

    /// Redis URL of the log service.
    #[serde(default = "default_log_url")]
    pub url: String,

    /// Number of pooled connections. Each in-flight blocking read holds one.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            backend: LogBackendKind::default(),
            url: default_log_url(),
            pool_size: default_pool_size(),
        }
    }
}

fn default_log_url() -> String {
    format!("redis://localhost:{DEFAULT_LOG_PORT}")
}

const fn default_pool_size() -> usize {
    8
}

/// Per-connection timing contract as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Deadline for each outbound frame.
    #[serde(default = "default_write_wait_ms")]
    pub write_wait_ms: u64,

    /// Read deadline, renewed by each keepalive response.
    #[serde(default = "default_pong_wait_ms")]
    pub pong_wait_ms: u64,

    /// Keepalive period. Defaults to nine tenths of `pong_wait_ms`.
    #[serde(default)]
    pub ping_period_ms: Option<u64>,

    /// Update poll period.
    #[serde(default = "default_file_period_ms")]
    pub file_period_ms: u64,

    /// Largest inbound message accepted from a viewer, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_wait_ms: default_write_wait_ms(),
            pong_wait_ms: default_pong_wait_ms(),
            ping_period_ms: None,
            file_period_ms: default_file_period_ms(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl SessionConfig {
    /// Resolve and validate the timing contract.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a period is zero or the
    /// keepalive period is not shorter than the read deadline.
    pub fn timings(&self) -> Result<SessionTimings, ConfigError> {
        let timings = SessionTimings::new(
            Duration::from_millis(self.write_wait_ms),
            Duration::from_millis(self.pong_wait_ms),
            Duration::from_millis(self.file_period_ms),
            self.max_message_size,
        )?;
        match self.ping_period_ms {
            Some(ms) => timings.with_ping_period(Duration::from_millis(ms)),
            None => Ok(timings),
        }
    }
}

const fn default_write_wait_ms() -> u64 {
    10_000
}

const fn default_pong_wait_ms() -> u64 {
    60_000
}

const fn default_file_period_ms() -> u64 {
    100
}

const fn default_max_message_size() -> usize {
    512
}

/// Resolved per-connection timing contract.
///
/// Always satisfies `ping_period < pong_wait`, so a keepalive reaches the
/// peer before its read deadline expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    write_wait: Duration,
    pong_wait: Duration,
    ping_period: Duration,
    file_period: Duration,
    max_message_size: usize,
}

impl SessionTimings {
    /// Build timings with the keepalive period derived as nine tenths of
    /// `pong_wait`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if any duration is zero.
    pub fn new(
        write_wait: Duration,
        pong_wait: Duration,
        file_period: Duration,
        max_message_size: usize,
    ) -> Result<Self, ConfigError> {
        let ping_period = pong_wait
            .checked_mul(9)
            .and_then(|d| d.checked_div(10))
            .ok_or_else(|| ConfigError::Invalid(String::from("pong_wait is too large")))?;
        let timings = Self {
            write_wait,
            pong_wait,
            ping_period,
            file_period,
            max_message_size,
        };
        timings.validate()?;
        Ok(timings)
    }

    /// Replace the keepalive period.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the period is zero or not
    /// shorter than `pong_wait`.
    pub fn with_ping_period(self, ping_period: Duration) -> Result<Self, ConfigError> {
        let timings = Self {
            ping_period,
            ..self
        };
        timings.validate()?;
        Ok(timings)
    }

    /// Check the timing invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("write_wait", self.write_wait),
            ("pong_wait", self.pong_wait),
            ("ping_period", self.ping_period),
            ("file_period", self.file_period),
        ];
        if let Some((name, _)) = named.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }
        if self.ping_period >= self.pong_wait {
            return Err(ConfigError::Invalid(format!(
                "ping_period ({:?}) must be shorter than pong_wait ({:?})",
                self.ping_period, self.pong_wait
            )));
        }
        Ok(())
    }

    /// Deadline for each outbound frame.
    pub const fn write_wait(&self) -> Duration {
        self.write_wait
    }

    /// Read deadline, renewed by each keepalive response.
    pub const fn pong_wait(&self) -> Duration {
        self.pong_wait
    }

    /// Keepalive period.
    pub const fn ping_period(&self) -> Duration {
        self.ping_period
    }

    /// Update poll period.
    pub const fn file_period(&self) -> Duration {
        self.file_period
    }

    /// Largest inbound message accepted, in bytes.
    pub const fn max_message_size(&self) -> usize {
        self.max_message_size
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            write_wait: Duration::from_millis(default_write_wait_ms()),
            pong_wait: Duration::from_millis(default_pong_wait_ms()),
            ping_period: Duration::from_millis(54_000),
            file_period: Duration::from_millis(default_file_period_ms()),
            max_message_size: default_max_message_size(),
        }
    }
}

/// What each poll cycle reads from the log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollerConfig {
    /// Stream key of the log.
    #[serde(default = "default_stream_key")]
    pub stream_key: String,

    /// Most entries consumed per poll cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// How long a poll waits on an empty log.
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Entry field rendered into the payload.
    #[serde(default = "default_field")]
    pub field: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            stream_key: default_stream_key(),
            batch_size: default_batch_size(),
            block_ms: default_block_ms(),
            field: default_field(),
        }
    }
}

impl PollerConfig {
    /// Wait window for an empty log.
    pub const fn block(&self) -> Duration {
        Duration::from_millis(self.block_ms)
    }
}

fn default_stream_key() -> String {
    String::from("stream")
}

const fn default_batch_size() -> u64 {
    25
}

const fn default_block_ms() -> u64 {
    100
}

fn default_field() -> String {
    String::from("tick")
}

/// Demonstration traffic appended by `/fire`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FireConfig {
    /// Number of entries appended per request (ticks `0..count`).
    #[serde(default = "default_fire_count")]
    pub count: u32,

    /// Pause between appends.
    #[serde(default = "default_fire_interval_ms")]
    pub interval_ms: u64,
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            count: default_fire_count(),
            interval_ms: default_fire_interval_ms(),
        }
    }
}

impl FireConfig {
    /// Pause between appends.
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

const fn default_fire_count() -> u32 {
    2001
}

const fn default_fire_interval_ms() -> u64 {
    1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.log.url, "redis://localhost:6379");
        assert_eq!(config.poller.batch_size, 25);
        assert_eq!(config.poller.block(), Duration::from_millis(100));
        assert_eq!(config.poller.field, "tick");
        assert_eq!(config.fire.count, 2001);
    }

    #[test]
    fn default_timings_match_resolved_defaults() {
        let resolved = SessionConfig::default().timings().unwrap();
        assert_eq!(resolved, SessionTimings::default());
        assert_eq!(resolved.ping_period(), Duration::from_secs(54));
        assert_eq!(resolved.write_wait(), Duration::from_secs(10));
        assert_eq!(resolved.file_period(), Duration::from_millis(100));
        assert_eq!(resolved.max_message_size(), 512);
    }

    #[test]
    fn ping_period_is_always_shorter_than_pong_wait() {
        for pong_ms in [10, 1_000, 60_000, 3_600_000] {
            let timings = SessionTimings::new(
                Duration::from_millis(10),
                Duration::from_millis(pong_ms),
                Duration::from_millis(5),
                512,
            )
            .unwrap();
            assert!(timings.ping_period() < timings.pong_wait());
        }
    }

    #[test]
    fn ping_period_not_shorter_than_pong_wait_is_rejected() {
        let yaml = "session:\n  pong_wait_ms: 1000\n  ping_period_ms: 1000\n";
        let config = RelayConfig::parse(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ping_period"));
    }

    #[test]
    fn zero_period_is_rejected() {
        let err = SessionTimings::new(
            Duration::from_secs(10),
            Duration::from_secs(60),
            Duration::ZERO,
            512,
        )
        .unwrap_err();
        assert!(err.to_string().contains("file_period"));
    }

    #[test]
    fn parse_partial_yaml_keeps_defaults() {
        let yaml = r"
http:
  port: 9000
log:
  backend: memory
poller:
  batch_size: 5
session:
  file_period_ms: 20
  pong_wait_ms: 2000
";
        let config = RelayConfig::parse(yaml).unwrap();
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.log.backend, LogBackendKind::Memory);
        assert_eq!(config.poller.batch_size, 5);
        assert_eq!(config.poller.stream_key, "stream");
        let timings = config.session.timings().unwrap();
        assert_eq!(timings.file_period(), Duration::from_millis(20));
        assert_eq!(timings.ping_period(), Duration::from_millis(1800));
    }

    #[test]
    fn log_host_without_port_gets_default_port() {
        let mut config = RelayConfig::default();
        config
            .apply_overrides(env(&[("LOG_HOST", "redis.internal")]))
            .unwrap();
        assert_eq!(config.log.url, "redis://redis.internal:6379");
    }

    #[test]
    fn log_host_with_port() {
        let mut config = RelayConfig::default();
        config
            .apply_overrides(env(&[("LOG_HOST", "10.0.0.5:6380")]))
            .unwrap();
        assert_eq!(config.log.url, "redis://10.0.0.5:6380");
    }

    #[test]
    fn log_url_wins_over_log_host() {
        let mut config = RelayConfig::default();
        config
            .apply_overrides(env(&[
                ("LOG_HOST", "ignored"),
                ("LOG_URL", "redis://cache:7000/2"),
            ]))
            .unwrap();
        assert_eq!(config.log.url, "redis://cache:7000/2");
    }

    #[test]
    fn relay_addr_overrides_listen_address() {
        let mut config = RelayConfig::default();
        config
            .apply_overrides(env(&[("RELAY_ADDR", "127.0.0.1:3000")]))
            .unwrap();
        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.http.port, 3000);

        // A bare ":port" keeps the configured host.
        config.apply_overrides(env(&[("RELAY_ADDR", ":4000")])).unwrap();
        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.http.port, 4000);
    }

    #[test]
    fn malformed_relay_addr_is_rejected() {
        let mut config = RelayConfig::default();
        assert!(config
            .apply_overrides(env(&[("RELAY_ADDR", "localhost")]))
            .is_err());
        assert!(config
            .apply_overrides(env(&[("RELAY_ADDR", "localhost:http")]))
            .is_err());
    }

    #[test]
    fn no_overrides_leave_config_unchanged() {
        let mut config = RelayConfig::default();
        config.apply_overrides(|_| None).unwrap();
        assert_eq!(config, RelayConfig::default());
    }
}
