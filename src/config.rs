//! Configuration module for upornot.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

use crate::probe::DEFAULT_TIMEOUT;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Hosts to probe (default: "127.0.0.1")
    pub targets: Vec<String>,
    /// Time between probes of the same target (default: 1s)
    pub interval: Duration,
    /// Per-probe deadline (default: 2s)
    pub timeout: Duration,
    /// Listen address for the query API (default: "127.0.0.1:4444")
    pub http_addr: String,
    /// Number of recent samples included in a summary (default: 10)
    pub recent: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            targets: vec!["127.0.0.1".to_string()],
            interval: Duration::from_secs(1),
            timeout: DEFAULT_TIMEOUT,
            http_addr: "127.0.0.1:4444".to_string(),
            recent: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPORNOT_TARGETS`: comma-separated hosts (default: "127.0.0.1")
    /// - `UPORNOT_INTERVAL`: probe interval in seconds (default: 1.0)
    /// - `UPORNOT_TIMEOUT`: probe timeout in seconds (default: 2.0)
    /// - `UPORNOT_HTTP_ADDR`: API listen address (default: "127.0.0.1:4444")
    /// - `UPORNOT_RECENT`: recent samples per summary (default: 10)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(targets) = lookup("UPORNOT_TARGETS") {
            let targets = parse_targets(&targets);
            if targets.is_empty() {
                tracing::warn!("UPORNOT_TARGETS is empty, keeping {:?}", cfg.targets);
            } else {
                cfg.targets = targets;
            }
        }

        if let Some(secs) = lookup("UPORNOT_INTERVAL") {
            match parse_seconds(&secs) {
                Some(interval) => cfg.interval = interval,
                None => tracing::warn!("Ignoring invalid UPORNOT_INTERVAL {:?}", secs),
            }
        }

        if let Some(secs) = lookup("UPORNOT_TIMEOUT") {
            match parse_seconds(&secs) {
                Some(timeout) => cfg.timeout = timeout,
                None => tracing::warn!("Ignoring invalid UPORNOT_TIMEOUT {:?}", secs),
            }
        }

        if let Some(addr) = lookup("UPORNOT_HTTP_ADDR") {
            cfg.http_addr = addr;
        }

        if let Some(recent) = lookup("UPORNOT_RECENT") {
            match recent.parse() {
                Ok(recent) => cfg.recent = recent,
                Err(_) => tracing::warn!("Ignoring invalid UPORNOT_RECENT {:?}", recent),
            }
        }

        cfg
    }
}

fn parse_targets(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Positive, finite seconds only.
fn parse_seconds(s: &str) -> Option<Duration> {
    let secs: f64 = s.trim().parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}
