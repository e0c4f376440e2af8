//! Text log persistence
//!
//! Writes location logs into a documents directory.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),
}

/// Result type for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;

/// Destination for finished session logs
pub trait PersistenceSink: Send + Sync {
    /// Write `lines` (newline-terminated) to `file_name` and return the full path
    fn append(&self, file_name: &str, lines: &[String]) -> PersistResult<PathBuf>;
}

/// Writes logs as files under a directory
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PersistenceSink for FileSink {
    fn append(&self, file_name: &str, lines: &[String]) -> PersistResult<PathBuf> {
        // A bare name only; no separators or parent references
        let name = Path::new(file_name);
        if file_name.is_empty() || name.file_name().map(|n| n != name.as_os_str()).unwrap_or(true) {
            return Err(PersistError::InvalidFileName(file_name.to_string()));
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let mut writer = BufWriter::new(file);
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} lines to {:?}", lines.len(), path);
        Ok(path)
    }
}
