use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collector the storefront has always shipped to.
pub const DEFAULT_COLLECTOR_URL: &str = "https://cod.xgoodspic.com";
/// Namespace segment of the collector path.
pub const DEFAULT_COLLECTOR_NAMESPACE: &str = "rrweb";
/// Flush period, in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;
/// Marker the referrer tracker splits hosts on.
pub const DEFAULT_REFERER_TLD_MARKER: &str = ".com";
/// Upload request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors raised when a `PipelineConfig` cannot be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value the pipeline cannot run with.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// The offending field, as spelled in the config file.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// An unknown dedup strategy name.
    #[error("Unknown dedup strategy '{0}' (expected 'timestamp' or 'sequence')")]
    UnknownDedup(String),
}

/// # Dedup Kind
///
/// Selects how the flusher decides which buffered records were already sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupKind {
    /// Key records by their `timestamp`. Records that share a timestamp with
    /// something already sent are never uploaded.
    #[default]
    Timestamp,
    /// Key records by their position in the buffer. Bounded ledger, no
    /// collision loss.
    Sequence,
}

impl fmt::Display for DedupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupKind::Timestamp => write!(f, "timestamp"),
            DedupKind::Sequence => write!(f, "sequence"),
        }
    }
}

impl FromStr for DedupKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timestamp" => Ok(DedupKind::Timestamp),
            "sequence" => Ok(DedupKind::Sequence),
            other => Err(ConfigError::UnknownDedup(other.to_string())),
        }
    }
}

/// # Pipeline Config
///
/// Everything an activation needs besides its collaborators. Every field has
/// a default, so a partial JSON object deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Scheme and host (optionally a base path) of the collector.
    pub collector_url: String,
    /// Path segment between `/record/` and the site host.
    pub collector_namespace: String,
    /// Period between flush ticks, in milliseconds.
    pub flush_interval_ms: u64,
    /// Which dedup strategy the flusher uses.
    pub dedup: DedupKind,
    /// Skip the network call when a tick selects nothing.
    pub skip_empty_uploads: bool,
    /// The referrer tracker compares everything before this marker.
    pub referer_tld_marker: String,
    /// Upload request timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collector_url: DEFAULT_COLLECTOR_URL.to_string(),
            collector_namespace: DEFAULT_COLLECTOR_NAMESPACE.to_string(),
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            dedup: DedupKind::default(),
            skip_empty_uploads: false,
            referer_tld_marker: DEFAULT_REFERER_TLD_MARKER.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// The flush period as a `Duration`.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// The upload timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects values that would stall or break the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "flushIntervalMs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.collector_namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "collectorNamespace",
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "requestTimeoutSecs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
