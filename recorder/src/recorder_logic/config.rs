use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lib_telemetry::configs::config_pipeline::ConfigError;
use lib_telemetry::{Capability, DedupKind, FileStore, PipelineConfig};

const DEFAULT_CONFIG_FILE: &str = "session_recorder.conf";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_SITE_HOST: &str = "localhost";
const STORAGE_FILE_NAME: &str = "storage.json";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Session event recorder with batched, fire-and-forget upload", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "RECORDER_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "RECORDER_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "RECORDER_LOG_LEVEL", help = "Logging level (debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "RECORDER_COLLECTOR_URL", help = "Base URL of the telemetry collector.")]
    pub collector_url: Option<String>,

    #[clap(long, env = "RECORDER_COLLECTOR_NAMESPACE", help = "Namespace segment of the collector record path.")]
    pub collector_namespace: Option<String>,

    #[clap(long, env = "RECORDER_FLUSH_INTERVAL_MS", help = "Milliseconds between flush ticks.")]
    pub flush_interval_ms: Option<u64>,

    #[clap(long, env = "RECORDER_DEDUP", help = "Dedup strategy: timestamp or sequence.")]
    pub dedup: Option<DedupKind>,

    #[clap(long, env = "RECORDER_SKIP_EMPTY_UPLOADS", help = "Skip uploads when a tick selects nothing (true/false).")]
    pub skip_empty_uploads: Option<bool>,

    #[clap(long, env = "RECORDER_REFERER_TLD_MARKER", help = "Marker the referrer tracker splits hosts on.")]
    pub referer_tld_marker: Option<String>,

    #[clap(long, env = "RECORDER_REQUEST_TIMEOUT_SECS", help = "Upload request timeout in seconds.")]
    pub request_timeout_secs: Option<u64>,

    #[clap(long, env = "RECORDER_STORAGE_PATH", help = "JSON file holding the client id and referrer slots.")]
    pub storage_path: Option<PathBuf>,

    #[clap(long, env = "RECORDER_SITE_HOST", help = "Host the events are captured on.")]
    pub site_host: Option<String>,

    #[clap(long, env = "RECORDER_REFERRER", help = "Navigation referrer of this activation.")]
    pub referrer: Option<String>,

    #[clap(long, env = "RECORDER_EVENTS_PATH", help = "NDJSON file of events. Reads stdin when unset.")]
    pub events_path: Option<PathBuf>,

    #[clap(long, env = "RECORDER_HEADLESS", help = "Run without an interactive client; telemetry becomes a no-op (true/false).")]
    pub headless: Option<bool>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            collector_url: other.collector_url.or(self.collector_url),
            collector_namespace: other.collector_namespace.or(self.collector_namespace),
            flush_interval_ms: other.flush_interval_ms.or(self.flush_interval_ms),
            dedup: other.dedup.or(self.dedup),
            skip_empty_uploads: other.skip_empty_uploads.or(self.skip_empty_uploads),
            referer_tld_marker: other.referer_tld_marker.or(self.referer_tld_marker),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            storage_path: other.storage_path.or(self.storage_path),
            site_host: other.site_host.or(self.site_host),
            referrer: other.referrer.or(self.referrer),
            events_path: other.events_path.or(self.events_path),
            headless: other.headless.or(self.headless),
        }
    }

    fn defaults() -> Config {
        let pipeline = PipelineConfig::default();
        Config {
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            collector_url: Some(pipeline.collector_url),
            collector_namespace: Some(pipeline.collector_namespace),
            flush_interval_ms: Some(pipeline.flush_interval_ms),
            dedup: Some(pipeline.dedup),
            skip_empty_uploads: Some(pipeline.skip_empty_uploads),
            referer_tld_marker: Some(pipeline.referer_tld_marker),
            request_timeout_secs: Some(pipeline.request_timeout_secs),
            storage_path: Some(default_storage_path()),
            site_host: Some(DEFAULT_SITE_HOST.to_string()),
            headless: Some(false),
            ..Default::default()
        }
    }

    pub fn log_dir(&self) -> &Path {
        self.log_dir.as_deref().unwrap_or(Path::new(DEFAULT_LOG_DIR))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn site_host(&self) -> &str {
        self.site_host.as_deref().unwrap_or(DEFAULT_SITE_HOST)
    }

    /// Library-side settings, validated.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            collector_url: self.collector_url.clone().unwrap_or(defaults.collector_url),
            collector_namespace: self
                .collector_namespace
                .clone()
                .unwrap_or(defaults.collector_namespace),
            flush_interval_ms: self.flush_interval_ms.unwrap_or(defaults.flush_interval_ms),
            dedup: self.dedup.unwrap_or(defaults.dedup),
            skip_empty_uploads: self.skip_empty_uploads.unwrap_or(defaults.skip_empty_uploads),
            referer_tld_marker: self
                .referer_tld_marker
                .clone()
                .unwrap_or(defaults.referer_tld_marker),
            request_timeout_secs: self.request_timeout_secs.unwrap_or(defaults.request_timeout_secs),
        };
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// The capability this process offers the pipeline.
    pub fn capability(&self) -> Capability {
        if self.headless.unwrap_or(false) {
            return Capability::Headless;
        }
        let storage_path = self.storage_path.clone().unwrap_or_else(default_storage_path);
        Capability::interactive(
            Arc::new(FileStore::new(storage_path)),
            self.site_host(),
            self.referrer.clone().filter(|r| !r.is_empty()),
        )
    }
}

fn default_storage_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("session_recorder").join(STORAGE_FILE_NAME),
        None => PathBuf::from(STORAGE_FILE_NAME),
    }
}

/// A message produced while loading, before any logger exists.
pub type LoadNotice = (log::Level, String);

pub fn load_config() -> (Config, Vec<LoadNotice>) {
    load_config_from(Config::parse())
}

/// Layers defaults, the config file and `cli` (which already carries
/// environment variables), later layers winning. Problems with the file are
/// returned as notices for the caller to log once logging is up.
pub fn load_config_from(cli: Config) -> (Config, Vec<LoadNotice>) {
    let mut notices = Vec::new();

    // 1. Load defaults
    let mut current_config = Config::defaults();

    // 2. Load from config file if present. The CLI may point elsewhere.
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
                Ok(file_config) => current_config = current_config.merge(file_config),
                Err(e) => notices.push((
                    log::Level::Warn,
                    format!(
                        "Failed to parse config file {}: {}. Falling back to other sources.",
                        config_file_path.display(),
                        e
                    ),
                )),
            },
            Err(e) => notices.push((
                log::Level::Warn,
                format!(
                    "Failed to read config file {}: {}. Falling back to other sources.",
                    config_file_path.display(),
                    e
                ),
            )),
        }
    } else {
        notices.push((
            log::Level::Info,
            format!(
                "Config file not found at {}. Using defaults and environment/CLI variables.",
                config_file_path.display()
            ),
        ));
    }

    // 3. Override with environment variables and CLI arguments
    (current_config.merge(cli), notices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layers_defaults_file_then_cli() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let file = dir.path().join("recorder.conf");
        fs::write(
            &file,
            r#"{"flushIntervalMs": 5000, "siteHost": "www.loramodas.com", "dedup": "sequence"}"#,
        )
        .unwrap();

        let cli = Config {
            config_path: Some(file),
            flush_interval_ms: Some(1500),
            ..Default::default()
        };
        let (config, notices) = load_config_from(cli);
        assert!(notices.is_empty());

        // CLI beats file, file beats defaults.
        assert_eq!(config.flush_interval_ms, Some(1500));
        assert_eq!(config.site_host(), "www.loramodas.com");
        assert_eq!(config.dedup, Some(DedupKind::Sequence));
        assert_eq!(config.log_level(), "info");

        let pipeline = config.pipeline_config().unwrap();
        assert_eq!(pipeline.flush_interval_ms, 1500);
        assert_eq!(pipeline.collector_namespace, "rrweb");
    }

    #[test]
    fn test_unparseable_file_falls_back_to_defaults() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let file = dir.path().join("broken.conf");
        fs::write(&file, "{ not json").unwrap();

        let (config, notices) = load_config_from(Config {
            config_path: Some(file),
            ..Default::default()
        });
        assert_eq!(config.flush_interval_ms, Some(10_000));
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, log::Level::Warn);
        assert!(notices[0].1.contains("broken.conf"));
        assert_eq!(config.headless, Some(false));
    }

    #[test]
    fn test_invalid_pipeline_values_are_rejected() {
        let config = Config {
            flush_interval_ms: Some(0),
            ..Config::defaults()
        };
        assert!(config.pipeline_config().is_err());
    }

    #[test]
    fn test_headless_flag_disables_capability() {
        let config = Config {
            headless: Some(true),
            ..Config::defaults()
        };
        assert!(!config.capability().is_interactive());

        let dir = tempdir().expect("Failed to create temporary directory");
        let config = Config {
            storage_path: Some(dir.path().join("slots.json")),
            ..Config::defaults()
        };
        assert!(config.capability().is_interactive());
    }
}
