//! Command handlers
//!
//! Entry points host surfaces call to drive the recorder.

pub mod recording;

pub use recording::{spawn_recorder, RecorderHandle};
