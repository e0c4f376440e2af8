//! Capture trait definitions
//!
//! Platform-agnostic contract for the video capture service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

/// Capture-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Camera could not be bound: {0}")]
    BindFailed(String),

    #[error("Camera is not bound")]
    NotBound,

    #[error("Capture already running")]
    AlreadyRecording,

    #[error("Capture not running")]
    NotRecording,

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Failed to stop capture: {0}")]
    StopFailed(String),
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Events emitted by a running capture
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Frames are being written to the output target
    Started,
    /// The output file was closed
    Finalized { path: PathBuf },
    /// Capture died on its own
    Failed(String),
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Recording quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    Sd,
    Hd,
    Fhd,
}

impl Default for VideoQuality {
    fn default() -> Self {
        Self::Hd
    }
}

impl std::str::FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sd" => Ok(Self::Sd),
            "hd" => Ok(Self::Hd),
            "fhd" => Ok(Self::Fhd),
            other => Err(format!("Unknown video quality: {}", other)),
        }
    }
}

impl VideoQuality {
    /// Frame size requested from the camera
    pub fn resolution(&self) -> Resolution {
        match self {
            VideoQuality::Sd => Resolution { width: 720, height: 480 },
            VideoQuality::Hd => Resolution { width: 1280, height: 720 },
            VideoQuality::Fhd => Resolution { width: 1920, height: 1080 },
        }
    }
}

/// A camera that can record video to a file.
///
/// `bind` acquires the device; `start` begins writing to `output` and hands
/// back the event stream for that recording. `Started` arrives on the stream
/// once frames are actually being written, which may be some time after
/// `start` returns.
#[async_trait]
pub trait CaptureService: Send {
    /// Acquire the camera
    async fn bind(&mut self) -> CaptureResult<()>;

    /// Whether `bind` has succeeded
    fn is_bound(&self) -> bool;

    /// Begin recording to `output`
    async fn start(&mut self, output: &Path) -> CaptureResult<mpsc::Receiver<CaptureEvent>>;

    /// Stop the running recording
    async fn stop(&mut self) -> CaptureResult<()>;
}
