//! User-facing notices
//!
//! Transient messages the host shows without blocking (toasts, status
//! lines). Failures never surface any other way.

use std::fmt;
use std::path::PathBuf;

/// How long a notice should stay visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeDuration {
    Short,
    Long,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    CameraBindFailed,
    CameraNotReady,
    PermissionsRequired,
    RecordingStarted,
    RecordingStopped,
    CaptureFailed(String),
    NoFix,
    LogSaved { path: PathBuf },
    SaveFailed,
}

impl Notice {
    pub fn duration(&self) -> NoticeDuration {
        match self {
            Notice::LogSaved { .. } => NoticeDuration::Long,
            _ => NoticeDuration::Short,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::CameraBindFailed => write!(f, "Error al iniciar la cámara"),
            Notice::CameraNotReady => write!(f, "La cámara no está lista"),
            Notice::PermissionsRequired => {
                write!(f, "Se requieren todos los permisos para usar la app")
            }
            Notice::RecordingStarted => write!(f, "Grabación iniciada"),
            Notice::RecordingStopped => write!(f, "Grabación detenida"),
            Notice::CaptureFailed(reason) => write!(f, "Error al grabar video: {}", reason),
            Notice::NoFix => write!(f, "No se pudo obtener ubicación"),
            Notice::LogSaved { path } => {
                write!(f, "Ubicaciones guardadas en: {}", path.display())
            }
            Notice::SaveFailed => write!(f, "Error al guardar archivo de texto"),
        }
    }
}
