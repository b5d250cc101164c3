pub mod capture;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod shutdown;
pub mod source;

use std::path::Path;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use capture::{DecodedImage, FrameMessage};
pub use error::{ConfigError, DecodeError, QueueClosed, SourceError, ViewerError};

/// Number of display slots the viewer can show at once.
pub const MAX_SLOTS: usize = 6;

/// Prefix for environment overrides, e.g. `HULLVIEW__SOURCE__PORT=5078`.
pub const ENV_PREFIX: &str = "HULLVIEW";

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub display: DisplayConfig,
}

/// Where the remote camera source lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub fetch_interval_ms: u64,
    pub roster_interval_ms: u64,
    pub roster_refresh: RosterRefresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub frame_interval_ms: u64,
    pub title: String,
}

/// When the roster poller rebuilds the slot assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterRefresh {
    /// Only when the number of reported cameras changes.
    #[default]
    Count,
    /// Whenever the reported set of cameras changes.
    Membership,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5077,
            request_timeout_ms: 2000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            fetch_interval_ms: 10,
            roster_interval_ms: 1000,
            roster_refresh: RosterRefresh::Count,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            // ~60 fps
            frame_interval_ms: 16,
            title: "Hullview".into(),
        }
    }
}

impl SourceConfig {
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl PipelineConfig {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    pub fn roster_interval(&self) -> Duration {
        Duration::from_millis(self.roster_interval_ms)
    }
}

impl DisplayConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and environment overrides.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_layers(path, ENV_PREFIX)
    }

    fn load_layers(path: &Path, env_prefix: &str) -> Result<Self, ConfigError> {
        let config = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Config::default())?)
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings, falling back to defaults on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                info!("Loaded settings from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to read settings ({}), using defaults", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.queue_capacity == 0 {
            return Err(ConfigError::Invalid("pipeline.queue_capacity must be > 0".into()));
        }
        if self.source.host.is_empty() {
            return Err(ConfigError::Invalid("source.host must not be empty".into()));
        }
        Ok(())
    }
}
