//! Recorder configuration
//!
//! Loaded from an optional JSON file; every field has a default so a partial
//! file (or none at all) is valid.

use crate::capture::FfmpegCaptureConfig;
use crate::permissions::Capability;
use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How location samples are collected while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPolicy {
    /// Subscribe to provider updates and keep every delivered fix
    Push,
    /// Read the last known fix on a fixed timer, skipping ticks without one
    Poll,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::Push
    }
}

impl std::str::FromStr for SamplingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "poll" => Ok(Self::Poll),
            other => Err(format!("Unknown sampling policy: {}", other)),
        }
    }
}

/// Location provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationConfig {
    /// Trace file replayed as the device position
    pub trace_path: Option<PathBuf>,
}

/// Top-level recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Where videos are written
    pub movies_dir: PathBuf,

    /// Where location logs are written
    pub documents_dir: PathBuf,

    pub sampling: SamplingPolicy,

    /// Sampling period in milliseconds
    pub interval_ms: u64,

    pub capture: FfmpegCaptureConfig,

    pub location: LocationConfig,

    /// Capabilities treated as already granted at startup
    pub granted_permissions: Vec<Capability>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            movies_dir: PathBuf::from("Movies"),
            documents_dir: PathBuf::from("Documents"),
            sampling: SamplingPolicy::Push,
            interval_ms: 1000,
            capture: FfmpegCaptureConfig::default(),
            location: LocationConfig::default(),
            granted_permissions: Vec::new(),
        }
    }
}

impl RecorderConfig {
    /// Read a config file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: RecorderConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Default output directories under `base`
    pub fn with_base_dir(mut self, base: &Path) -> Self {
        self.movies_dir = base.join("Movies");
        self.documents_dir = base.join("Documents");
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.interval_ms == 0 {
            return Err(AppError::Config("intervalMs must be greater than zero".to_string()));
        }
        if self.capture.device.trim().is_empty() {
            return Err(AppError::Config("capture.device must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
