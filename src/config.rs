//! Monitor Configuration
//!
//! Loaded from TOML, with every field defaulted so a partial file (or no
//! file at all) still yields a complete configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Env var naming the TOML file to load.
pub const CONFIG_PATH_ENV: &str = "FEED_MONITOR_CONFIG_PATH";

/// File picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "feed_monitor.toml";

/// Main configuration for the feed order monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Listing page whose freshness order is checked
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Number of leading feed items checked per cycle
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Interval between cycle starts
    #[serde(default = "default_period", with = "duration_serde")]
    pub period: Duration,

    /// HTTP request timeout for one page fetch
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Launch the platform viewer on the report after a failing cycle
    #[serde(default)]
    pub open_report: bool,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_feed_url() -> String {
    "https://news.ycombinator.com/newest".to_string()
}

fn default_window_size() -> usize {
    100
}

fn default_period() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("feed-order-monitor/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            window_size: default_window_size(),
            period: default_period(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            open_report: false,
            storage: StorageConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the configuration: explicit path, then `FEED_MONITOR_CONFIG_PATH`,
    /// then `feed_monitor.toml` in the working directory, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            info!("Loading config from {}", path.display());
            return Self::load(path);
        }

        if let Some(path) = std::env::var(CONFIG_PATH_ENV).ok().filter(|v| !v.trim().is_empty()) {
            info!("Loading config from {} ({})", path, CONFIG_PATH_ENV);
            return Self::load(path);
        }

        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.exists() {
            info!("Loading config from {}", fallback.display());
            return Self::load(fallback);
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_size == 0 {
            bail!("window_size must be at least 1");
        }
        if self.period.is_zero() {
            bail!("period must be non-zero");
        }
        if !(self.feed_url.starts_with("http://") || self.feed_url.starts_with("https://")) {
            bail!("feed_url must be an http(s) URL, got {}", self.feed_url);
        }
        Ok(())
    }

    /// Save to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Locations of the durable evidence artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving page snapshots of failing cycles
    #[serde(default = "default_evidence_dir")]
    pub evidence_dir: PathBuf,
    /// Append-only CSV of violations
    #[serde(default = "default_table_path")]
    pub table_path: PathBuf,
    /// Append-only human-readable log
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// Most recent report, overwritten each failing cycle
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

fn default_evidence_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

fn default_table_path() -> PathBuf {
    PathBuf::from("sorting_errors.csv")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("sorting_errors.log")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("report.html")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            evidence_dir: default_evidence_dir(),
            table_path: default_table_path(),
            log_path: default_log_path(),
            report_path: default_report_path(),
        }
    }
}

// Serde helper for Duration (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
