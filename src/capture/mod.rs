//! Video capture
//!
//! The capture contract plus an ffmpeg-backed camera implementation.

pub mod ffmpeg;
pub mod traits;

pub use ffmpeg::{FfmpegCapture, FfmpegCaptureConfig};
pub use traits::{
    CaptureError, CaptureEvent, CaptureResult, CaptureService, Resolution, VideoQuality,
};
