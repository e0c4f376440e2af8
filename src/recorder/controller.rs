//! Recording session controller
//!
//! Ties the capture service, the location source and the persistence sink
//! together. The controller is owned by a single task which handles user
//! commands, capture events, location deliveries and poll ticks one at a
//! time, so the sample buffer is never touched concurrently.

use super::error::{RecordingError, RecordingResult};
use super::notice::Notice;
use super::state::{ControllerStatus, RecordingState, Session};
use crate::capture::{CaptureEvent, CaptureService};
use crate::config::{RecorderConfig, SamplingPolicy};
use crate::location::{FixBatch, LocationRequest, LocationSource};
use crate::permissions::{Capability, GateDecision, PermissionGate};
use crate::persistence::{session_log_lines, PersistenceSink};
use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};

/// Commands accepted by [`SessionController::run`]
#[derive(Debug)]
pub enum ControlCommand {
    /// The record button: start when idle, stop when recording
    Toggle {
        reply: oneshot::Sender<RecordingState>,
    },
    Start {
        reply: oneshot::Sender<RecordingState>,
    },
    Stop {
        reply: oneshot::Sender<Option<PathBuf>>,
    },
    /// Check permissions and bind the camera
    Arm {
        reply: oneshot::Sender<bool>,
    },
    /// Answer to a permission prompt
    PermissionResult {
        request_code: i32,
        results: Vec<(Capability, bool)>,
    },
    Status {
        reply: oneshot::Sender<ControllerStatus>,
    },
    /// Stop any active session and exit the loop
    Shutdown,
}

/// Something a platform service produced
#[derive(Debug)]
enum SourceEvent {
    Capture(Option<CaptureEvent>),
    Fixes(Option<FixBatch>),
    Tick,
}

/// Owns one recorder and its (at most one) active session
pub struct SessionController {
    state: RecordingState,
    movies_dir: PathBuf,
    sampling: SamplingPolicy,
    interval: Duration,

    capture: Box<dyn CaptureService>,
    location: Box<dyn LocationSource>,
    sink: Box<dyn PersistenceSink>,
    permissions: PermissionGate,

    session: Option<Session>,
    capture_events: Option<mpsc::Receiver<CaptureEvent>>,
    fixes: Option<mpsc::Receiver<FixBatch>>,
    poll: Option<Interval>,

    /// Most recent video the capture service finished writing
    last_video: Option<PathBuf>,

    notice_tx: broadcast::Sender<Notice>,
}

impl SessionController {
    pub fn new(
        config: &RecorderConfig,
        capture: Box<dyn CaptureService>,
        location: Box<dyn LocationSource>,
        sink: Box<dyn PersistenceSink>,
        permissions: PermissionGate,
    ) -> Self {
        let (notice_tx, _) = broadcast::channel(64);
        Self {
            state: RecordingState::Idle,
            movies_dir: config.movies_dir.clone(),
            sampling: config.sampling,
            interval: config.interval(),
            capture,
            location,
            sink,
            permissions,
            session: None,
            capture_events: None,
            fixes: None,
            poll: None,
            last_video: None,
            notice_tx,
        }
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Subscribe to user-facing notices
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    /// Permissions granted and camera bound
    pub fn is_armed(&self) -> bool {
        self.permissions.all_granted() && self.capture.is_bound()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            state: self.state(),
            armed: self.is_armed(),
            missing_permissions: self.permissions.missing(),
            session_id: self.session.as_ref().map(|s| s.id),
            sample_count: self.session.as_ref().map_or(0, |s| s.samples().len()),
            last_video: self.last_video.clone(),
        }
    }

    fn notify(&self, notice: Notice) {
        tracing::debug!("Notice: {}", notice);
        // Nobody listening is fine
        let _ = self.notice_tx.send(notice);
    }

    /// Make the recorder ready: prompt for missing permissions, or bind the
    /// camera once everything is granted. Returns whether it is armed.
    pub async fn arm(&mut self) -> bool {
        if !self.permissions.all_granted() {
            if self.permissions.request_missing() {
                tracing::info!("Waiting for permissions: {:?}", self.permissions.missing());
            }
            return false;
        }

        if self.capture.is_bound() {
            return true;
        }

        match self.capture.bind().await {
            Ok(()) => {
                tracing::info!("Recorder armed");
                true
            }
            Err(e) => {
                tracing::error!("Failed to bind camera: {}", e);
                self.notify(Notice::CameraBindFailed);
                false
            }
        }
    }

    /// Handle the answer to a permission prompt. The camera is bound again
    /// only when every capability was granted.
    pub async fn on_permissions_result(&mut self, request_code: i32, results: &[(Capability, bool)]) {
        match self.permissions.on_result(request_code, results) {
            GateDecision::Granted => {
                self.arm().await;
            }
            GateDecision::Denied => self.notify(Notice::PermissionsRequired),
            GateDecision::Ignored => {}
        }
    }

    /// Start when idle, stop when recording
    pub async fn toggle(&mut self) -> RecordingState {
        match self.state() {
            RecordingState::Idle => self.start().await,
            RecordingState::Recording => {
                self.stop().await;
                self.state()
            }
        }
    }

    /// Start a session. Failures are reported as notices and leave the
    /// recorder idle.
    pub async fn start(&mut self) -> RecordingState {
        if let Err(e) = self.try_start().await {
            tracing::warn!("Recording not started: {}", e);
            match e {
                RecordingError::AlreadyRecording => {}
                RecordingError::PermissionDenied(_) => self.notify(Notice::PermissionsRequired),
                RecordingError::NotReady => self.notify(Notice::CameraNotReady),
                RecordingError::Capture(e) => self.notify(Notice::CaptureFailed(e.to_string())),
            }
        }
        self.state()
    }

    async fn try_start(&mut self) -> RecordingResult<()> {
        if self.state() == RecordingState::Recording {
            return Err(RecordingError::AlreadyRecording);
        }

        if !self.permissions.all_granted() {
            let missing = self.permissions.missing();
            self.permissions.request_missing();
            return Err(RecordingError::PermissionDenied(missing));
        }

        if !self.capture.is_bound() {
            return Err(RecordingError::NotReady);
        }

        let session = Session::new(Local::now(), &self.movies_dir);
        tracing::info!("Starting session {} to {:?}", session.id, session.video_path);

        let events = self.capture.start(&session.video_path).await?;

        self.capture_events = Some(events);
        self.session = Some(session);
        self.state = RecordingState::Recording;
        Ok(())
    }

    /// Stop the session, flush its samples and return the log path.
    /// A no-op when idle.
    pub async fn stop(&mut self) -> Option<PathBuf> {
        if self.state() == RecordingState::Idle {
            tracing::debug!("Stop requested while idle");
            return None;
        }

        // Sampling ends at the stop request, before the capture finalizes
        self.end_sampling().await;

        if let Err(e) = self.capture.stop().await {
            tracing::warn!("Capture did not stop cleanly: {}", e);
        }
        self.state = RecordingState::Idle;

        if let Some(events) = self.capture_events.take() {
            self.drain_capture_events(events);
        }

        let saved = match self.session.take() {
            Some(session) => self.flush(session),
            None => None,
        };

        self.notify(Notice::RecordingStopped);
        saved
    }

    fn flush(&self, session: Session) -> Option<PathBuf> {
        let lines = session_log_lines(session.samples());
        match self.sink.append(&session.log_file_name(), &lines) {
            Ok(path) => {
                tracing::info!(
                    "Session {} saved {} samples to {:?}",
                    session.id,
                    lines.len(),
                    path
                );
                self.notify(Notice::LogSaved { path: path.clone() });
                Some(path)
            }
            Err(e) => {
                tracing::error!("Failed to save session {}: {}", session.id, e);
                self.notify(Notice::SaveFailed);
                None
            }
        }
    }

    async fn begin_sampling(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.begin_sampling();

        match self.sampling {
            SamplingPolicy::Push => {
                let request = LocationRequest::high_accuracy(self.interval);
                match self.location.subscribe(request).await {
                    Ok(rx) => self.fixes = Some(rx),
                    Err(e) => {
                        tracing::warn!("Location updates unavailable: {}", e);
                        self.notify(Notice::NoFix);
                    }
                }
            }
            SamplingPolicy::Poll => {
                let mut ticker = tokio::time::interval(self.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.poll = Some(ticker);
            }
        }

        tracing::debug!("Location sampling started ({:?})", self.sampling);
    }

    /// Consume what the capture reported while stopping
    fn drain_capture_events(&mut self, mut events: mpsc::Receiver<CaptureEvent>) {
        events.close();
        while let Ok(event) = events.try_recv() {
            match event {
                CaptureEvent::Finalized { path } => self.on_video_finalized(path),
                CaptureEvent::Failed(reason) => {
                    tracing::warn!("Capture reported a failure while stopping: {}", reason);
                }
                CaptureEvent::Started => {}
            }
        }
    }

    fn on_video_finalized(&mut self, path: PathBuf) {
        tracing::info!("Video saved to {:?}", path);
        self.last_video = Some(path);
    }

    /// Cancel sampling, keeping whatever was already delivered
    async fn end_sampling(&mut self) {
        self.poll = None;

        if let Some(mut rx) = self.fixes.take() {
            self.location.unsubscribe().await;
            rx.close();
            while let Ok(batch) = rx.try_recv() {
                self.on_fixes(batch);
            }
        }
    }

    /// Append a delivered batch to the active session
    pub fn on_fixes(&mut self, batch: FixBatch) {
        if let Some(session) = self.session.as_mut() {
            for fix in &batch {
                tracing::debug!("Fix: {}, {}", fix.latitude, fix.longitude);
            }
            session.push_fixes(&batch);
        }
    }

    /// Poll the last known fix once
    pub async fn on_tick(&mut self) {
        match self.location.last_known().await {
            Ok(Some(fix)) => self.on_fixes(vec![fix]),
            Ok(None) => self.notify(Notice::NoFix),
            Err(e) => {
                tracing::warn!("Failed to read location: {}", e);
                self.notify(Notice::NoFix);
            }
        }
    }

    pub async fn on_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Started => {
                let waiting = self.state() == RecordingState::Recording
                    && self.session.as_ref().map_or(false, |s| !s.is_sampling());
                if waiting {
                    self.notify(Notice::RecordingStarted);
                    self.begin_sampling().await;
                }
            }
            CaptureEvent::Finalized { path } => self.on_video_finalized(path),
            CaptureEvent::Failed(reason) => {
                if self.state() == RecordingState::Recording {
                    tracing::error!("Capture failed: {}", reason);
                    self.notify(Notice::CaptureFailed(reason));
                    self.stop().await;
                }
            }
        }
    }

    async fn next_source_event(&mut self) -> SourceEvent {
        tokio::select! {
            event = recv_or_pending(&mut self.capture_events) => SourceEvent::Capture(event),
            batch = recv_or_pending(&mut self.fixes) => SourceEvent::Fixes(batch),
            _ = tick_or_pending(&mut self.poll) => SourceEvent::Tick,
        }
    }

    async fn handle_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Capture(Some(event)) => self.on_capture_event(event).await,
            SourceEvent::Capture(None) => self.capture_events = None,
            SourceEvent::Fixes(Some(batch)) => self.on_fixes(batch),
            SourceEvent::Fixes(None) => {
                tracing::warn!("Location updates ended");
                self.fixes = None;
            }
            SourceEvent::Tick => self.on_tick().await,
        }
    }

    async fn handle_command(&mut self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::Toggle { reply } => {
                let _ = reply.send(self.toggle().await);
            }
            ControlCommand::Start { reply } => {
                let _ = reply.send(self.start().await);
            }
            ControlCommand::Stop { reply } => {
                let _ = reply.send(self.stop().await);
            }
            ControlCommand::Arm { reply } => {
                let _ = reply.send(self.arm().await);
            }
            ControlCommand::PermissionResult {
                request_code,
                results,
            } => self.on_permissions_result(request_code, &results).await,
            ControlCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            ControlCommand::Shutdown => return false,
        }
        true
    }

    /// Process commands and service events until shutdown or until every
    /// command sender is gone. An active session is stopped and flushed on
    /// the way out.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ControlCommand>) {
        tracing::info!("Recorder loop started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let keep_running = match command {
                        Some(command) => self.handle_command(command).await,
                        None => false,
                    };
                    if !keep_running {
                        break;
                    }
                }
                event = self.next_source_event() => self.handle_source_event(event).await,
            }
        }

        self.stop().await;
        tracing::info!("Recorder loop finished");
    }
}

async fn recv_or_pending<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick_or_pending(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::PERMISSION_REQUEST_CODE;
    use crate::location::{LocationFix, ReplayLocationSource};
    use crate::recorder::testing::{FakeCapture, FakeLocation, FakePermissions, MemorySink};
    use std::collections::VecDeque;

    struct Harness {
        controller: SessionController,
        capture: FakeCapture,
        location: FakeLocation,
        sink: MemorySink,
        permissions: FakePermissions,
        notices: broadcast::Receiver<Notice>,
    }

    fn harness_with(sampling: SamplingPolicy, permissions: FakePermissions) -> Harness {
        let config = RecorderConfig {
            sampling,
            ..RecorderConfig::default()
        };
        let capture = FakeCapture::acking();
        let location = FakeLocation::default();
        let sink = MemorySink::default();

        let controller = SessionController::new(
            &config,
            Box::new(capture.clone()),
            Box::new(location.clone()),
            Box::new(sink.clone()),
            PermissionGate::new(Box::new(permissions.clone())),
        );
        let notices = controller.subscribe();

        Harness {
            controller,
            capture,
            location,
            sink,
            permissions,
            notices,
        }
    }

    async fn armed(sampling: SamplingPolicy) -> Harness {
        let mut h = harness_with(sampling, FakePermissions::all());
        assert!(h.controller.arm().await);
        h
    }

    impl Harness {
        /// Handle the next service event
        async fn pump(&mut self) {
            let event = self.controller.next_source_event().await;
            self.controller.handle_source_event(event).await;
        }

        fn drain_notices(&mut self) -> Vec<Notice> {
            let mut notices = Vec::new();
            while let Ok(notice) = self.notices.try_recv() {
                notices.push(notice);
            }
            notices
        }
    }

    fn all_granted() -> Vec<(Capability, bool)> {
        Capability::REQUIRED.iter().map(|c| (*c, true)).collect()
    }

    #[tokio::test]
    async fn test_two_fixes_then_stop() {
        let mut h = armed(SamplingPolicy::Push).await;

        assert_eq!(h.controller.start().await, RecordingState::Recording);
        h.pump().await; // Started
        assert!(h.location.is_subscribed());

        let request = h.location.state.lock().requests[0];
        assert_eq!(request, LocationRequest::high_accuracy(Duration::from_millis(1000)));

        assert!(h.location.deliver(vec![LocationFix::new(10.0, 20.0)]));
        h.pump().await;
        assert!(h.location.deliver(vec![LocationFix::new(10.1, 20.1)]));
        h.pump().await;

        let path = h.controller.stop().await.unwrap();
        assert!(path.to_string_lossy().contains("ubicaciones_"));
        assert_eq!(h.controller.state(), RecordingState::Idle);
        assert!(h.controller.session().is_none());
        assert!(!h.location.is_subscribed());

        assert_eq!(
            h.sink.only_file(),
            vec![
                "Segundo 1: Latitud = 10.0, Longitud = 20.0",
                "Segundo 2: Latitud = 10.1, Longitud = 20.1",
            ]
        );

        let video = h.capture.state.lock().outputs[0].clone();
        assert_eq!(h.controller.status().last_video, Some(video));

        let notices = h.drain_notices();
        assert_eq!(notices[0], Notice::RecordingStarted);
        assert!(matches!(notices[1], Notice::LogSaved { .. }));
        assert_eq!(notices[2], Notice::RecordingStopped);
    }

    #[tokio::test]
    async fn test_batch_with_several_fixes_keeps_order() {
        let mut h = armed(SamplingPolicy::Push).await;
        h.controller.start().await;
        h.pump().await;

        h.location.deliver(vec![
            LocationFix::new(1.0, 1.0),
            LocationFix::new(2.0, 2.0),
            LocationFix::new(3.0, 3.0),
        ]);
        h.pump().await;
        h.location.deliver(Vec::new());
        h.pump().await;

        h.controller.stop().await;
        let lines = h.sink.only_file();
        assert_eq!(lines.len(), 3);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.starts_with(&format!("Segundo {}: ", i + 1)));
        }
    }

    #[tokio::test]
    async fn test_stop_before_started_writes_empty_log() {
        let mut h = armed(SamplingPolicy::Push).await;
        h.controller.start().await;

        h.controller.stop().await;
        assert_eq!(h.controller.state(), RecordingState::Idle);
        assert!(h.sink.only_file().is_empty());
        assert!(!h.location.is_subscribed());
        assert_eq!(h.capture.state.lock().stop_calls, 1);
    }

    #[tokio::test]
    async fn test_stop_keeps_queued_deliveries() {
        let mut h = armed(SamplingPolicy::Push).await;
        h.controller.start().await;
        h.pump().await;

        h.location.deliver(vec![LocationFix::new(5.0, 6.0)]);
        h.location.deliver(vec![LocationFix::new(5.5, 6.5)]);

        h.controller.stop().await;
        assert_eq!(h.sink.only_file().len(), 2);
        assert_eq!(h.location.state.lock().unsubscribe_calls, 1);
    }

    #[tokio::test]
    async fn test_consecutive_sessions_do_not_mix() {
        let mut h = armed(SamplingPolicy::Push).await;

        h.controller.start().await;
        h.pump().await;
        h.location.deliver(vec![LocationFix::new(1.0, 1.0)]);
        h.pump().await;
        h.controller.stop().await;
        let first = h.sink.files.lock().clone();
        h.sink.files.lock().clear();

        h.controller.start().await;
        h.pump().await;
        h.location.deliver(vec![LocationFix::new(2.0, 2.0)]);
        h.pump().await;
        h.controller.stop().await;

        assert_eq!(first.values().next().unwrap().len(), 1);
        assert_eq!(
            h.sink.only_file(),
            vec!["Segundo 1: Latitud = 2.0, Longitud = 2.0"]
        );
        assert_eq!(h.capture.state.lock().outputs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_poll_sessions_do_not_mix() {
        let mut h = armed(SamplingPolicy::Poll).await;
        h.location.state.lock().last_known = VecDeque::from(vec![
            Some(LocationFix::new(1.0, 1.0)),
            Some(LocationFix::new(2.0, 2.0)),
        ]);

        h.controller.start().await;
        h.pump().await; // Started
        h.pump().await; // tick
        h.controller.stop().await;
        let first = h.sink.only_file();
        h.sink.files.lock().clear();

        h.controller.start().await;
        h.pump().await;
        h.pump().await;
        h.controller.stop().await;

        assert_eq!(first, vec!["Segundo 1: Latitud = 1.0, Longitud = 1.0"]);
        assert_eq!(
            h.sink.only_file(),
            vec!["Segundo 1: Latitud = 2.0, Longitud = 2.0"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_capture_stop_takes_no_more_samples() {
        let capture = FakeCapture::acking();
        capture.state.lock().stop_delay = Some(Duration::from_millis(3500));
        let trace = (0..10)
            .map(|i| LocationFix::new(10.0 + i as f64, 20.0))
            .collect();
        let sink = MemorySink::default();

        let mut controller = SessionController::new(
            &RecorderConfig::default(),
            Box::new(capture.clone()),
            Box::new(ReplayLocationSource::new(trace)),
            Box::new(sink.clone()),
            PermissionGate::new(Box::new(FakePermissions::all())),
        );
        assert!(controller.arm().await);
        controller.start().await;

        // Started, then two deliveries one second apart
        for _ in 0..3 {
            let event = controller.next_source_event().await;
            controller.handle_source_event(event).await;
        }
        assert_eq!(controller.status().sample_count, 2);

        controller.stop().await;
        assert_eq!(
            sink.only_file(),
            vec![
                "Segundo 1: Latitud = 10.0, Longitud = 20.0",
                "Segundo 2: Latitud = 11.0, Longitud = 20.0",
            ]
        );
        assert_eq!(capture.state.lock().stop_calls, 1);
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let mut h = armed(SamplingPolicy::Push).await;
        assert_eq!(h.controller.stop().await, None);
        assert!(h.sink.files.lock().is_empty());
        assert_eq!(h.capture.state.lock().stop_calls, 0);
        assert!(h.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_starts_and_stops() {
        let mut h = armed(SamplingPolicy::Push).await;
        assert_eq!(h.controller.toggle().await, RecordingState::Recording);
        assert_eq!(h.controller.toggle().await, RecordingState::Idle);
        assert_eq!(h.sink.files.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_still_goes_idle() {
        let mut h = armed(SamplingPolicy::Push).await;
        *h.sink.fail.lock() = true;

        h.controller.start().await;
        h.pump().await;
        h.location.deliver(vec![LocationFix::new(1.0, 1.0)]);
        h.pump().await;

        assert_eq!(h.controller.stop().await, None);
        assert_eq!(h.controller.state(), RecordingState::Idle);
        assert!(h.controller.session().is_none());

        let notices = h.drain_notices();
        assert!(notices.contains(&Notice::SaveFailed));
        assert_eq!(notices.last(), Some(&Notice::RecordingStopped));
    }

    #[tokio::test]
    async fn test_bind_failure_reported_and_start_refused() {
        let mut h = harness_with(SamplingPolicy::Push, FakePermissions::all());
        h.capture.state.lock().fail_bind = true;

        assert!(!h.controller.arm().await);
        assert_eq!(h.drain_notices(), vec![Notice::CameraBindFailed]);

        assert_eq!(h.controller.start().await, RecordingState::Idle);
        assert_eq!(h.drain_notices(), vec![Notice::CameraNotReady]);
        assert!(h.capture.state.lock().outputs.is_empty());
    }

    #[tokio::test]
    async fn test_capture_start_failure_stays_idle() {
        let mut h = armed(SamplingPolicy::Push).await;
        h.capture.state.lock().fail_start = true;

        assert_eq!(h.controller.start().await, RecordingState::Idle);
        let notices = h.drain_notices();
        assert!(matches!(notices.as_slice(), [Notice::CaptureFailed(_)]));
        assert!(h.controller.session().is_none());
    }

    #[tokio::test]
    async fn test_denied_permission_blocks_until_granted() {
        let mut h = harness_with(SamplingPolicy::Push, FakePermissions::default());

        assert!(!h.controller.arm().await);
        assert_eq!(*h.permissions.requests.lock(), vec![PERMISSION_REQUEST_CODE]);

        h.controller
            .on_permissions_result(
                PERMISSION_REQUEST_CODE,
                &[
                    (Capability::Camera, true),
                    (Capability::CoarseLocation, true),
                    (Capability::FineLocation, false),
                ],
            )
            .await;
        assert!(!h.controller.is_armed());
        assert!(!h.capture.is_bound());
        assert_eq!(h.drain_notices(), vec![Notice::PermissionsRequired]);

        assert_eq!(h.controller.start().await, RecordingState::Idle);
        assert_eq!(h.drain_notices(), vec![Notice::PermissionsRequired]);
        assert_eq!(h.permissions.requests.lock().len(), 2);

        h.controller
            .on_permissions_result(PERMISSION_REQUEST_CODE, &all_granted())
            .await;
        assert!(h.controller.is_armed());
        assert_eq!(h.controller.start().await, RecordingState::Recording);
    }

    #[tokio::test]
    async fn test_capture_failure_ends_session() {
        let mut h = armed(SamplingPolicy::Push).await;
        h.controller.start().await;
        h.pump().await;
        h.location.deliver(vec![LocationFix::new(1.0, 1.0)]);
        h.pump().await;

        h.capture.emit(CaptureEvent::Failed("device unplugged".to_string()));
        h.pump().await;

        assert_eq!(h.controller.state(), RecordingState::Idle);
        assert_eq!(h.sink.only_file().len(), 1);
        assert!(h
            .drain_notices()
            .contains(&Notice::CaptureFailed("device unplugged".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_skips_ticks_without_fix() {
        let mut h = armed(SamplingPolicy::Poll).await;
        h.location.state.lock().last_known = VecDeque::from(vec![
            Some(LocationFix::new(10.0, 20.0)),
            None,
            Some(LocationFix::new(10.1, 20.1)),
        ]);

        h.controller.start().await;
        h.pump().await; // Started
        h.pump().await; // tick
        h.pump().await; // tick, no fix
        h.pump().await; // tick

        h.controller.stop().await;
        assert_eq!(
            h.sink.only_file(),
            vec![
                "Segundo 1: Latitud = 10.0, Longitud = 20.0",
                "Segundo 2: Latitud = 10.1, Longitud = 20.1",
            ]
        );
        assert!(h.drain_notices().contains(&Notice::NoFix));
        assert!(h.location.state.lock().requests.is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_session() {
        let mut h = armed(SamplingPolicy::Push).await;
        assert!(h.controller.status().session_id.is_none());

        h.controller.start().await;
        h.pump().await;
        h.location.deliver(vec![LocationFix::new(1.0, 1.0)]);
        h.pump().await;

        let status = h.controller.status();
        assert_eq!(status.state, RecordingState::Recording);
        assert!(status.armed);
        assert!(status.session_id.is_some());
        assert_eq!(status.sample_count, 1);
    }
}
