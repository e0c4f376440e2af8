//! FFmpeg camera capture
//!
//! Records a camera device to an H.264 file by driving an `ffmpeg` child
//! process. Recording is considered started once ffmpeg reports that it is
//! encoding; stopping sends `q` on stdin so the container is finalized.
//! If ffmpeg exits without being asked to, the recording's event stream
//! reports `Failed`.

use super::traits::{CaptureError, CaptureEvent, CaptureResult, CaptureService, VideoQuality};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Settings for the ffmpeg capture process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FfmpegCaptureConfig {
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// Input demuxer (`v4l2`, `avfoundation`, `dshow`, `lavfi`...)
    pub input_format: String,

    /// Device passed to `-i`
    pub device: String,

    /// Requested frame size
    pub quality: VideoQuality,

    /// How long to wait for ffmpeg to finalize the file after `q`
    pub stop_timeout_ms: u64,
}

impl Default for FfmpegCaptureConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            input_format: "v4l2".to_string(),
            device: "/dev/video0".to_string(),
            quality: VideoQuality::Hd,
            stop_timeout_ms: 5000,
        }
    }
}

/// Camera capture backed by an ffmpeg process
pub struct FfmpegCapture {
    config: FfmpegCaptureConfig,
    bound: bool,
    process: Option<Child>,
    output: Option<PathBuf>,
    event_tx: Option<mpsc::Sender<CaptureEvent>>,
    monitor: Option<JoinHandle<()>>,
    stop_requested: Arc<AtomicBool>,
}

impl FfmpegCapture {
    pub fn new(config: FfmpegCaptureConfig) -> Self {
        Self {
            config,
            bound: false,
            process: None,
            output: None,
            event_tx: None,
            monitor: None,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Arguments for recording to `output`
    fn record_args(&self, output: &Path) -> Vec<String> {
        let resolution = self.config.quality.resolution();
        vec![
            "-hide_banner".to_string(),
            "-nostats".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            self.config.input_format.clone(),
            "-video_size".to_string(),
            format!("{}x{}", resolution.width, resolution.height),
            "-i".to_string(),
            self.config.device.clone(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

/// Whether an ffmpeg stderr line means frames are being encoded
fn is_encoding_line(line: &str) -> bool {
    line.contains("Press [q] to stop") || line.trim_start().starts_with("frame=")
}

#[async_trait]
impl CaptureService for FfmpegCapture {
    async fn bind(&mut self) -> CaptureResult<()> {
        let status = Command::new(&self.config.ffmpeg_path)
            .args(["-hide_banner", "-version"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| CaptureError::BindFailed(format!("Failed to run ffmpeg: {}", e)))?;

        if !status.success() {
            return Err(CaptureError::BindFailed(format!(
                "ffmpeg exited with {}",
                status
            )));
        }

        // Device nodes must exist up front; other inputs (lavfi graphs,
        // avfoundation indices) are only checked when recording starts
        if self.config.device.starts_with("/dev/") && !Path::new(&self.config.device).exists() {
            return Err(CaptureError::BindFailed(format!(
                "Camera device not found: {}",
                self.config.device
            )));
        }

        self.bound = true;
        tracing::info!(
            "Camera bound: {} ({})",
            self.config.device,
            self.config.input_format
        );
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    async fn start(&mut self, output: &Path) -> CaptureResult<mpsc::Receiver<CaptureEvent>> {
        if !self.bound {
            return Err(CaptureError::NotBound);
        }
        if self.process.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CaptureError::StartFailed(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let args = self.record_args(output);
        tracing::debug!("Spawning ffmpeg: {:?}", args);

        let mut process = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::StartFailed(format!("Failed to start ffmpeg: {}", e)))?;

        let stderr = process
            .stderr
            .take()
            .ok_or_else(|| CaptureError::StartFailed("Failed to capture ffmpeg stderr".to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(16);
        let monitor_tx = event_tx.clone();
        let stop_requested = Arc::new(AtomicBool::new(false));
        let monitor_stop = stop_requested.clone();

        let monitor = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut started = false;

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if !started && is_encoding_line(&line) {
                            started = true;
                            let _ = monitor_tx.send(CaptureEvent::Started).await;
                        } else {
                            tracing::trace!("ffmpeg: {}", line);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Failed to read ffmpeg output: {}", e);
                        break;
                    }
                }
            }

            let failure = if !started {
                Some("ffmpeg exited before recording started")
            } else if !monitor_stop.load(Ordering::SeqCst) {
                Some("ffmpeg exited while recording")
            } else {
                None
            };

            if let Some(reason) = failure {
                tracing::error!("{}", reason);
                let _ = monitor_tx
                    .send(CaptureEvent::Failed(reason.to_string()))
                    .await;
            }
        });

        self.process = Some(process);
        self.output = Some(output.to_path_buf());
        self.event_tx = Some(event_tx);
        self.monitor = Some(monitor);
        self.stop_requested = stop_requested;

        tracing::info!("Capture started: {:?}", output);
        Ok(event_rx)
    }

    async fn stop(&mut self) -> CaptureResult<()> {
        let mut process = self.process.take().ok_or(CaptureError::NotRecording)?;
        self.stop_requested.store(true, Ordering::SeqCst);

        if let Some(mut stdin) = process.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                tracing::warn!("Failed to signal ffmpeg: {}", e);
            }
            let _ = stdin.flush().await;
        }

        let timeout = Duration::from_millis(self.config.stop_timeout_ms);
        match tokio::time::timeout(timeout, process.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("ffmpeg exited with {}", status);
            }
            Ok(Err(e)) => {
                return Err(CaptureError::StopFailed(format!(
                    "Failed to wait for ffmpeg: {}",
                    e
                )));
            }
            Err(_) => {
                tracing::warn!("ffmpeg did not finish within {:?}, killing it", timeout);
                process
                    .kill()
                    .await
                    .map_err(|e| CaptureError::StopFailed(format!("Failed to kill ffmpeg: {}", e)))?;
            }
        }

        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.await;
        }

        if let (Some(tx), Some(path)) = (self.event_tx.take(), self.output.take()) {
            tracing::info!("Capture finalized: {:?}", path);
            let _ = tx.send(CaptureEvent::Finalized { path }).await;
        }

        Ok(())
    }
}
