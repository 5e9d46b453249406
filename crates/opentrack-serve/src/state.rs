//! Application state and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use opentrack_core::IdentifierPolicy;
use opentrack_log::{
    AppendLog, EventLogReader, EventRecorder, ProxyPolicy, RecorderHandle, StatusAggregator,
};

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000").
    pub bind_addr: String,

    /// Path to the NDJSON event log.
    pub log_path: PathBuf,

    /// Which identifiers produce recorded events.
    pub identifier_policy: IdentifierPolicy,

    /// Whether automated-proxy fetches count as opens.
    pub proxy_policy: ProxyPolicy,

    /// Prometheus exporter port (0 disables).
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `PORT`: Listen port (default: 3000)
    /// - `TRACKER_HOST`: Bind host (default: "0.0.0.0")
    /// - `TRACKER_LOG_PATH`: Event log path (default: "./data/opens.jsonl")
    /// - `TRACKER_STRICT_IDS`: Only record `et_<17 hex>` identifiers (default: false)
    /// - `TRACKER_COUNT_PROXY_OPENS`: Count mail-proxy fetches as opens (default: true)
    /// - `METRICS_PORT`: Prometheus exporter port, 0 disables (default: 0)
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = match std::env::var("PORT") {
            Ok(value) => value
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{value}'"))?,
            Err(_) => 3000,
        };

        let host = std::env::var("TRACKER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let bind_addr = format!("{host}:{port}");

        let log_path = std::env::var("TRACKER_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/opens.jsonl"));

        let identifier_policy = if env_flag("TRACKER_STRICT_IDS", false)? {
            IdentifierPolicy::Strict
        } else {
            IdentifierPolicy::AcceptAll
        };

        let proxy_policy = if env_flag("TRACKER_COUNT_PROXY_OPENS", true)? {
            ProxyPolicy::Include
        } else {
            ProxyPolicy::Exclude
        };

        let metrics_port: u16 = match std::env::var("METRICS_PORT") {
            Ok(value) => value
                .trim()
                .parse()
                .with_context(|| format!("METRICS_PORT must be a port number, got '{value}'"))?,
            Err(_) => 0,
        };

        tracing::info!(
            bind_addr = %bind_addr,
            log_path = %log_path.display(),
            identifier_policy = ?identifier_policy,
            proxy_policy = ?proxy_policy,
            metrics_port,
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            log_path,
            identifier_policy,
            proxy_policy,
            metrics_port,
        })
    }
}

fn env_flag(name: &str, default: bool) -> anyhow::Result<bool> {
    let Ok(value) = std::env::var(name) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{name} must be a boolean, got '{other}'"),
    }
}

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Queue into the event writer thread.
    pub recorder: EventRecorder,

    /// Read side of the event log.
    pub status: StatusAggregator,
}

impl AppState {
    /// Open the event log and start the writer thread.
    ///
    /// The returned [`RecorderHandle`] must be finished after the server
    /// (and with it every clone of this state) has shut down.
    pub fn new(config: Config) -> anyhow::Result<(Self, RecorderHandle)> {
        let log = AppendLog::open(&config.log_path)
            .with_context(|| format!("failed to open event log {}", config.log_path.display()))?;
        let (recorder, handle) =
            EventRecorder::spawn(log).context("failed to start event writer")?;

        let status = StatusAggregator::new(
            EventLogReader::new(&config.log_path),
            config.proxy_policy,
        );

        Ok((
            Self {
                config: Arc::new(config),
                recorder,
                status,
            },
            handle,
        ))
    }
}
