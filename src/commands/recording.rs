//! Recording command handlers
//!
//! The controller lives on its own task; host surfaces talk to it through
//! a [`RecorderHandle`] that sends commands and awaits the replies.

use crate::permissions::Capability;
use crate::recorder::{ControlCommand, ControllerStatus, Notice, RecordingState, SessionController};
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Cloneable handle to a running recorder
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<ControlCommand>,
    notice_tx: broadcast::Sender<Notice>,
}

/// Spawn the controller loop and return a handle to it
pub fn spawn_recorder(controller: SessionController) -> (RecorderHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(32);
    let (notice_tx, _) = broadcast::channel(64);

    // Forward controller notices to the handle's own channel so receivers can
    // be created after the controller has moved onto its task
    let mut notices = controller.subscribe();
    let forward_tx = notice_tx.clone();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => {
                    let _ = forward_tx.send(notice);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} notices", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let task = tokio::spawn(controller.run(rx));
    (RecorderHandle { tx, notice_tx }, task)
}

impl RecorderHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ControlCommand,
    ) -> Result<T, String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| "Recorder is not running".to_string())?;
        rx.await.map_err(|_| "Recorder dropped the request".to_string())
    }

    /// Subscribe to user-facing notices
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    /// Record button
    pub async fn toggle_recording(&self) -> Result<RecordingState, String> {
        self.request(|reply| ControlCommand::Toggle { reply }).await
    }

    pub async fn start_recording(&self) -> Result<RecordingState, String> {
        self.request(|reply| ControlCommand::Start { reply }).await
    }

    /// Stop recording; returns the saved location log, if any
    pub async fn stop_recording(&self) -> Result<Option<PathBuf>, String> {
        self.request(|reply| ControlCommand::Stop { reply }).await
    }

    /// Check permissions and bind the camera
    pub async fn arm(&self) -> Result<bool, String> {
        self.request(|reply| ControlCommand::Arm { reply }).await
    }

    /// Deliver the answer to a permission prompt
    pub async fn permissions_result(
        &self,
        request_code: i32,
        results: Vec<(Capability, bool)>,
    ) -> Result<(), String> {
        self.tx
            .send(ControlCommand::PermissionResult {
                request_code,
                results,
            })
            .await
            .map_err(|_| "Recorder is not running".to_string())
    }

    pub async fn get_recording_state(&self) -> Result<ControllerStatus, String> {
        self.request(|reply| ControlCommand::Status { reply }).await
    }

    /// Stop any active session and end the controller loop
    pub async fn shutdown(&self) -> Result<(), String> {
        self.tx
            .send(ControlCommand::Shutdown)
            .await
            .map_err(|_| "Recorder is not running".to_string())
    }
}
