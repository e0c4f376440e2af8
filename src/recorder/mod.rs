//! Recording system module
//!
//! - SessionController orchestrating capture, location sampling and persistence
//! - Recording state machine and session tracking
//! - User-facing notices

pub mod controller;
pub mod error;
pub mod notice;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ControlCommand, SessionController};
pub use error::{RecordingError, RecordingResult};
pub use notice::{Notice, NoticeDuration};
pub use state::{ControllerStatus, RecordingState, Session};
