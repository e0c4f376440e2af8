//! Recording state management
//!
//! Defines the recording state machine and session tracking.

use crate::location::LocationFix;
use crate::permissions::Capability;
use crate::persistence::{log_file_name, video_file_name};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Current state of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Currently recording
    Recording,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// One contiguous recording, from start to stop
#[derive(Debug, Clone)]
pub struct Session {
    /// Id for log correlation
    pub id: Uuid,

    /// Wall-clock start, used for output file names
    pub started_at: DateTime<Local>,

    /// Video output target
    pub video_path: PathBuf,

    /// Samples in capture order
    samples: Vec<LocationFix>,

    /// Whether location sampling has begun
    sampling: bool,
}

impl Session {
    /// Create a session starting at `started_at`
    pub fn new(started_at: DateTime<Local>, movies_dir: &Path) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_path: movies_dir.join(video_file_name(&started_at)),
            started_at,
            samples: Vec::new(),
            sampling: false,
        }
    }

    /// Begin sampling with an empty buffer
    pub fn begin_sampling(&mut self) {
        self.samples.clear();
        self.sampling = true;
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    /// Append fixes in delivery order; ignored before sampling begins
    pub fn push_fixes(&mut self, fixes: &[LocationFix]) {
        if self.sampling {
            self.samples.extend_from_slice(fixes);
        }
    }

    pub fn samples(&self) -> &[LocationFix] {
        &self.samples
    }

    /// Name of the location log for this session
    pub fn log_file_name(&self) -> String {
        log_file_name(&self.started_at)
    }
}

/// Snapshot of the controller for host surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub state: RecordingState,

    /// Permissions granted and camera bound
    pub armed: bool,

    /// Capabilities still waiting for a grant
    pub missing_permissions: Vec<Capability>,

    pub session_id: Option<Uuid>,

    pub sample_count: usize,

    /// Last video written to disk
    pub last_video: Option<PathBuf>,
}
