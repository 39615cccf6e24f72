//! Relay server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `tickrelay.yaml` (or defaults) and apply
//!    environment overrides
//! 3. Validate the session timing contract
//! 4. Connect the stream log backend
//! 5. Serve HTTP + `WebSocket` until `Ctrl-C`

use std::path::Path;
use std::sync::Arc;

use tickrelay_core::config::LogBackendKind;
use tickrelay_core::{ConfigError, RelayConfig};
use tickrelay_log::{LogBackend, MemoryStreamLog, RedisStreamLog};
use tickrelay_server::{start_server, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point for the relay server.
///
/// # Errors
///
/// Returns an error if configuration, the log connection, or the server
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("tickrelay starting");

    // 2-3. Load and validate configuration.
    let config = load_config()?;
    let timings = config.session.timings()?;
    info!(
        host = config.http.host,
        port = config.http.port,
        backend = ?config.log.backend,
        stream_key = config.poller.stream_key,
        batch_size = config.poller.batch_size,
        file_period_ms = timings.file_period().as_millis(),
        ping_period_ms = timings.ping_period().as_millis(),
        pong_wait_ms = timings.pong_wait().as_millis(),
        "Configuration loaded"
    );

    // 4. Connect the log.
    let log: LogBackend = match config.log.backend {
        LogBackendKind::Redis => RedisStreamLog::connect(
            &config.log.url,
            config.log.pool_size,
            config.poller.stream_key.as_str(),
        )
        .await?
        .into(),
        LogBackendKind::Memory => MemoryStreamLog::new().into(),
    };
    info!(backend = log.kind(), "Stream log ready");

    // 5. Serve.
    let state = Arc::new(AppState::new(Arc::new(log), &config)?);
    start_server(&config.http, state).await?;

    Ok(())
}

/// Load `tickrelay.yaml` from the working directory, falling back to
/// defaults (with environment overrides) when it does not exist.
fn load_config() -> Result<RelayConfig, ConfigError> {
    let config_path = Path::new("tickrelay.yaml");
    if config_path.exists() {
        RelayConfig::from_file(config_path)
    } else {
        info!("Config file not found, using defaults");
        let mut config = RelayConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }
}
