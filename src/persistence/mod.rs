//! Session log persistence
//!
//! Line format and file naming for location logs, and the sink that
//! writes them.

pub mod format;
pub mod sink;

pub use format::{format_sample_line, log_file_name, session_log_lines, video_file_name};
pub use sink::{FileSink, PersistError, PersistResult, PersistenceSink};
