//! In-memory stand-ins for the platform services

use crate::capture::{CaptureError, CaptureEvent, CaptureResult, CaptureService};
use crate::location::{
    FixBatch, LocationFix, LocationRequest, LocationResult, LocationSource,
};
use crate::permissions::{Capability, PermissionProvider};
use crate::persistence::{PersistError, PersistResult, PersistenceSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct FakeCaptureState {
    pub fail_bind: bool,
    pub fail_start: bool,
    /// Send `Started` as soon as recording begins
    pub auto_ack: bool,
    /// Time `stop` takes to finalize the file
    pub stop_delay: Option<Duration>,
    pub bound: bool,
    pub recording: bool,
    pub outputs: Vec<PathBuf>,
    pub stop_calls: usize,
    pub event_tx: Option<mpsc::Sender<CaptureEvent>>,
}

#[derive(Clone, Default)]
pub struct FakeCapture {
    pub state: Arc<Mutex<FakeCaptureState>>,
}

impl FakeCapture {
    pub fn acking() -> Self {
        let capture = Self::default();
        capture.state.lock().auto_ack = true;
        capture
    }

    /// Deliver an event on the current recording's stream
    pub fn emit(&self, event: CaptureEvent) {
        if let Some(tx) = self.state.lock().event_tx.as_ref() {
            let _ = tx.try_send(event);
        }
    }
}

#[async_trait]
impl CaptureService for FakeCapture {
    async fn bind(&mut self) -> CaptureResult<()> {
        let mut state = self.state.lock();
        if state.fail_bind {
            return Err(CaptureError::BindFailed("camera in use".to_string()));
        }
        state.bound = true;
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.state.lock().bound
    }

    async fn start(&mut self, output: &Path) -> CaptureResult<mpsc::Receiver<CaptureEvent>> {
        let mut state = self.state.lock();
        if !state.bound {
            return Err(CaptureError::NotBound);
        }
        if state.fail_start {
            return Err(CaptureError::StartFailed("encoder unavailable".to_string()));
        }

        let (tx, rx) = mpsc::channel(8);
        if state.auto_ack {
            let _ = tx.try_send(CaptureEvent::Started);
        }
        state.recording = true;
        state.outputs.push(output.to_path_buf());
        state.event_tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> CaptureResult<()> {
        let delay = self.state.lock().stop_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.stop_calls += 1;
        if !state.recording {
            return Err(CaptureError::NotRecording);
        }
        state.recording = false;
        if let Some(tx) = state.event_tx.take() {
            if let Some(path) = state.outputs.last().cloned() {
                let _ = tx.try_send(CaptureEvent::Finalized { path });
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLocationState {
    pub requests: Vec<LocationRequest>,
    pub tx: Option<mpsc::Sender<FixBatch>>,
    pub unsubscribe_calls: usize,
    /// Answers for successive `last_known` calls; empty means no fix
    pub last_known: VecDeque<Option<LocationFix>>,
}

#[derive(Clone, Default)]
pub struct FakeLocation {
    pub state: Arc<Mutex<FakeLocationState>>,
}

impl FakeLocation {
    /// Push a batch through the active subscription. Returns false when
    /// nobody is subscribed.
    pub fn deliver(&self, batch: FixBatch) -> bool {
        match self.state.lock().tx.as_ref() {
            Some(tx) => tx.try_send(batch).is_ok(),
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().tx.is_some()
    }
}

#[async_trait]
impl LocationSource for FakeLocation {
    async fn subscribe(&mut self, request: LocationRequest) -> LocationResult<mpsc::Receiver<FixBatch>> {
        let (tx, rx) = mpsc::channel(32);
        let mut state = self.state.lock();
        state.requests.push(request);
        state.tx = Some(tx);
        Ok(rx)
    }

    async fn unsubscribe(&mut self) {
        let mut state = self.state.lock();
        state.unsubscribe_calls += 1;
        state.tx = None;
    }

    async fn last_known(&mut self) -> LocationResult<Option<LocationFix>> {
        Ok(self.state.lock().last_known.pop_front().flatten())
    }
}

#[derive(Clone, Default)]
pub struct MemorySink {
    pub files: Arc<Mutex<HashMap<String, Vec<String>>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn only_file(&self) -> Vec<String> {
        let files = self.files.lock();
        assert_eq!(files.len(), 1, "expected exactly one log file");
        files.values().next().cloned().unwrap_or_default()
    }
}

impl PersistenceSink for MemorySink {
    fn append(&self, file_name: &str, lines: &[String]) -> PersistResult<PathBuf> {
        if *self.fail.lock() {
            return Err(PersistError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only storage",
            )));
        }
        self.files
            .lock()
            .insert(file_name.to_string(), lines.to_vec());
        Ok(PathBuf::from("/documents").join(file_name))
    }
}

#[derive(Clone, Default)]
pub struct FakePermissions {
    pub granted: Arc<Mutex<HashSet<Capability>>>,
    pub requests: Arc<Mutex<Vec<i32>>>,
}

impl FakePermissions {
    pub fn all() -> Self {
        let permissions = Self::default();
        permissions.granted.lock().extend(Capability::REQUIRED);
        permissions
    }
}

impl PermissionProvider for FakePermissions {
    fn is_granted(&self, capability: Capability) -> bool {
        self.granted.lock().contains(&capability)
    }

    fn request(&mut self, _capabilities: &[Capability], request_code: i32) {
        self.requests.lock().push(request_code);
    }

    fn record(&mut self, capability: Capability, granted: bool) {
        let mut set = self.granted.lock();
        if granted {
            set.insert(capability);
        } else {
            set.remove(&capability);
        }
    }
}
