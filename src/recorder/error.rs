use crate::capture::CaptureError;
use crate::permissions::Capability;
use thiserror::Error;

/// Recording lifecycle errors
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("Missing permissions: {0:?}")]
    PermissionDenied(Vec<Capability>),

    #[error("Camera is not ready")]
    NotReady,

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;
