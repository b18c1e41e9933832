//! Configuration for the Stress Sensor Agent.

use crate::capture::Region;
use crate::core::{PipelineSettings, RoutePolicy};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Directory name used under the platform config and data dirs.
const APP_DIR: &str = "stress-sensor-agent";

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame pipeline tunables
    pub pipeline: PipelineConfig,

    /// Event emission settings
    pub emitter: EmitterConfig,

    /// Ingestion server settings
    pub server: ServerSettings,

    /// Path for persisted stats and the default event log
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();

        Self {
            pipeline: PipelineConfig::default(),
            emitter: EmitterConfig::default(),
            server: ServerSettings::with_data_dir(&data_dir),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Path of the persisted pipeline statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("pipeline_stats.json")
    }

    /// Check values the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        if !(0.0..=1.0).contains(&p.threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be within [0, 1], got {}",
                p.threshold
            )));
        }
        if p.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be at least 1".to_string()));
        }
        if !p.asymmetry_gain.is_finite() || p.asymmetry_gain < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "asymmetry_gain must be a non-negative number, got {}",
                p.asymmetry_gain
            )));
        }
        if self.server.capacity == 0 {
            return Err(ConfigError::Invalid("server capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Frame pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of raw scores averaged
    pub window_size: usize,
    /// Alert threshold on the smoothed score
    pub threshold: f64,
    /// Minimum time between one-shot alerts
    #[serde(with = "duration_serde")]
    pub cooldown: Duration,
    /// Gain applied to the brightness asymmetry
    pub asymmetry_gain: f64,
    /// Tier table for classification
    pub policy: RoutePolicy,
    /// Fixed region of interest; centred box when absent
    pub region: Option<Region>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self {
            window_size: settings.window_size,
            threshold: settings.threshold,
            cooldown: settings.cooldown,
            asymmetry_gain: settings.asymmetry_gain,
            policy: settings.policy,
            region: None,
        }
    }
}

impl PipelineConfig {
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            window_size: self.window_size,
            threshold: self.threshold,
            cooldown: self.cooldown,
            asymmetry_gain: self.asymmetry_gain,
            policy: self.policy.clone(),
        }
    }
}

/// Event emission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Whether events are posted at all
    pub enabled: bool,
    /// Ingestion service base URL
    pub api_url: String,
    /// Device identifier stamped on events
    pub device_id: String,
    /// User identifier stamped on events
    pub user_id: String,
    /// Minimum time between delivery attempts
    #[serde(with = "duration_serde")]
    pub push_interval: Duration,
    /// Per-request timeout
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "http://127.0.0.1:8000".to_string(),
            device_id: default_device_id(),
            user_id: "demo-user".to_string(),
            push_interval: crate::emitter::DEFAULT_PUSH_INTERVAL,
            timeout: Duration::from_millis(2500),
        }
    }
}

/// Ingestion server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: IpAddr,
    pub port: u16,
    /// Number of events kept in memory
    pub capacity: usize,
    /// Durable event log
    pub log_path: PathBuf,
}

impl ServerSettings {
    fn with_data_dir(data_dir: &std::path::Path) -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            capacity: crate::store::buffer::DEFAULT_CAPACITY,
            log_path: data_dir.join("events_log.csv"),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::with_data_dir(&default_data_dir())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Generate a device ID from hostname + instance.
fn default_device_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("edge-{}-{}", hostname, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as fractional seconds.
mod duration_serde {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
