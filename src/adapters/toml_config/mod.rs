// TOML config adapter - Configuration loaded from TOML files and the environment

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::model::LogBook;
use crate::engine::commands::{EncoderOptions, RetrievalOptions};
use crate::error::{ClipError, ClipResult};

/// Locations of the external tools; bare names are looked up in PATH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub retriever: PathBuf,
    pub trimmer: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            retriever: PathBuf::from("yt-dlp"),
            trimmer: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub grace_period_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 2000,
        }
    }
}

impl SupervisorConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub socket_timeout_secs: u32,
    pub retries: u32,
    /// Extra seconds fetched on each side when downloading sections only
    pub section_padding_secs: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let options = RetrievalOptions::default();
        Self {
            socket_timeout_secs: options.socket_timeout_secs,
            retries: options.retries,
            section_padding_secs: 5.0,
        }
    }
}

impl RetrievalConfig {
    pub fn options(&self) -> RetrievalOptions {
        RetrievalOptions {
            socket_timeout_secs: self.socket_timeout_secs,
            retries: self.retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub log_capacity: usize,
    pub name_probe_limit: usize,
    /// Parent of per-job temp directories; system temp dir when unset
    pub temp_root: Option<PathBuf>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            log_capacity: LogBook::DEFAULT_CAPACITY,
            name_probe_limit: 1000,
            temp_root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub folder: PathBuf,
    pub template: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("."),
            template: "{title} [{start}-{end}]".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tools: ToolsConfig,
    pub supervisor: SupervisorConfig,
    pub retrieval: RetrievalConfig,
    pub trim: EncoderOptions,
    pub job: JobConfig,
    pub output: OutputConfig,
}

/// Environment variables applied over file values
const ENV_RETRIEVER: &str = "CLIPFETCH_RETRIEVER";
const ENV_TRIMMER: &str = "CLIPFETCH_TRIMMER";
const ENV_GRACE_PERIOD_MS: &str = "CLIPFETCH_GRACE_PERIOD_MS";

impl AppConfig {
    /// Default config file location (`<config dir>/clipfetch/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clipfetch").join("config.toml"))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> ClipResult<Self> {
        toml::from_str(content).map_err(|e| ClipError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })
    }

    /// Load configuration: defaults, then file, then environment.
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> ClipResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::load_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> ClipResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClipError::io(format!("Failed to read config file {}", path.display()), e))?;
        info!("Loading configuration from: {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ClipResult<()> {
        if let Some(value) = lookup(ENV_RETRIEVER) {
            info!("Found environment override: {} = {}", ENV_RETRIEVER, value);
            self.tools.retriever = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_TRIMMER) {
            info!("Found environment override: {} = {}", ENV_TRIMMER, value);
            self.tools.trimmer = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_GRACE_PERIOD_MS) {
            self.supervisor.grace_period_ms = value.parse().map_err(|e| ClipError::Config {
                message: format!("Invalid {}: {}", ENV_GRACE_PERIOD_MS, e),
            })?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ClipResult<()> {
        let invalid = |message: &str| -> ClipResult<()> {
            Err(ClipError::Config {
                message: message.to_string(),
            })
        };

        if self.supervisor.grace_period_ms == 0 {
            return invalid("supervisor.grace_period_ms must be greater than zero");
        }
        if self.job.log_capacity == 0 {
            return invalid("job.log_capacity must be greater than zero");
        }
        if self.job.name_probe_limit == 0 {
            return invalid("job.name_probe_limit must be greater than zero");
        }
        if !self.retrieval.section_padding_secs.is_finite() || self.retrieval.section_padding_secs < 0.0 {
            return invalid("retrieval.section_padding_secs must be a non-negative number");
        }
        if self.trim.video_codec.trim().is_empty() || self.trim.audio_codec.trim().is_empty() {
            return invalid("trim codecs cannot be empty");
        }
        Ok(())
    }
}
