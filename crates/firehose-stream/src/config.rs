//! Client configuration, loadable from YAML or JSON.

use firehose_core::ConfigError;
use firehose_observability::LogConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Configuration for a [`FirehoseClient`](crate::FirehoseClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirehoseConfig {
    /// Feed server URL (`ws://` or `wss://`)
    pub server: String,
    /// Chain API used for ABI fetches (`http://` or `https://`)
    pub chain_endpoint: String,
    /// Capacity of the decoded-event broadcast channel
    pub channel_capacity: usize,
    /// Envelopes decoded concurrently
    pub max_in_flight: usize,
    /// Deliver events in arrival order instead of completion order
    pub ordered_delivery: bool,
    /// Timeout for chain API requests in milliseconds
    pub request_timeout_ms: u64,
    pub reconnect: ReconnectConfig,
    /// Requests sent after every (re)connect
    pub subscriptions: Vec<Subscription>,
    pub log: LogConfig,
}

impl Default for FirehoseConfig {
    fn default() -> Self {
        Self {
            server: "ws://127.0.0.1:8080".into(),
            chain_endpoint: "http://127.0.0.1:8888".into(),
            channel_capacity: 1024,
            max_in_flight: 64,
            ordered_delivery: false,
            request_timeout_ms: 15_000,
            reconnect: ReconnectConfig::default(),
            subscriptions: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl FirehoseConfig {
    /// Parse YAML (or JSON, which is a subset) and validate.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("server", &self.server, &["ws", "wss"])?;
        check_url("chain_endpoint", &self.chain_endpoint, &["http", "https"])?;
        if self.channel_capacity == 0 {
            return Err(invalid("channel_capacity must be at least 1"));
        }
        if self.max_in_flight == 0 {
            return Err(invalid("max_in_flight must be at least 1"));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms must be positive"));
        }
        if self.reconnect.backoff_ms == 0 {
            return Err(invalid("reconnect.backoff_ms must be positive"));
        }
        if self.reconnect.max_backoff_ms < self.reconnect.backoff_ms {
            return Err(invalid("reconnect.max_backoff_ms must not be below reconnect.backoff_ms"));
        }
        if let Some(sub) = self.subscriptions.iter().find(|s| s.kind.is_empty()) {
            return Err(invalid(format!("subscription with empty type (data: {})", sub.data)));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

fn check_url(field: &str, raw: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field: field.into(),
        reason: format!("`{raw}`: {e}"),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidUrl {
            field: field.into(),
            reason: format!(
                "`{raw}`: scheme must be one of {}, got `{}`",
                schemes.join("/"),
                url.scheme()
            ),
        });
    }
    Ok(url)
}

/// Reconnection policy for the feed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Consecutive failed attempts before giving up
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further attempt
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 5,
            backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl ReconnectConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let ms = self
            .backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// An outbound request, sent as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Subscription {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// The text frame put on the wire.
    pub fn to_frame(&self) -> String {
        request_frame(&self.kind, &self.data)
    }
}

pub(crate) fn request_frame(kind: &str, data: &Value) -> String {
    serde_json::json!({ "type": kind, "data": data }).to_string()
}
