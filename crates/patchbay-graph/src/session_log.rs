//! Session log files with retention-capped rotation.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, warn};

/// Most recent files kept in the log folder after a log closes.
pub const LOG_RETENTION: usize = 50;

/// File name prefix for document session logs.
pub const SESSION_LOG_PREFIX: &str = "Patchbay_Log_";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("io error in session log: {0}")]
    Io(#[from] std::io::Error),
    #[error("no config directory on this platform")]
    NoConfigDir,
}

/// An open, timestamp-named log file.
///
/// Closing (explicitly or on drop) releases the file handle first, then
/// prunes the folder down to the newest [`LOG_RETENTION`] files, the
/// just-closed one counted like any other.
#[derive(Debug)]
pub struct SessionLog {
    file: Option<File>,
    path: PathBuf,
    folder: PathBuf,
}

impl SessionLog {
    /// Creates `<folder>/<prefix><YYYY-MM-DD_HH-MM-SS>.txt`, creating the
    /// folder as needed, and writes the header line.
    pub fn create_in(folder: impl Into<PathBuf>, prefix: &str) -> Result<Self, LogError> {
        let folder = folder.into();
        fs::create_dir_all(&folder)?;
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let path = folder.join(format!("{prefix}{stamp}.txt"));
        let mut file = File::create(&path)?;
        writeln!(
            file,
            "Session started {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        file.flush()?;
        Ok(Self {
            file: Some(file),
            path,
            folder,
        })
    }

    /// [`create_in`](Self::create_in) at the platform default folder.
    pub fn create(prefix: &str) -> Result<Self, LogError> {
        Self::create_in(Self::default_folder()?, prefix)
    }

    pub fn default_folder() -> Result<PathBuf, LogError> {
        let mut folder = dirs::config_dir().ok_or(LogError::NoConfigDir)?;
        folder.push("Patchbay");
        folder.push("logs");
        Ok(folder)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a timestamped line, best effort.
    pub fn log(&mut self, message: &str) {
        let Some(file) = self.file.as_mut() else { return };
        let stamp = Local::now().format("%H:%M:%S");
        if writeln!(file, "[{stamp}] {message}")
            .and_then(|_| file.flush())
            .is_err()
        {
            warn!("failed to append to session log");
        }
    }

    /// Closes the file and prunes the folder.
    pub fn close(mut self) {
        self.close_and_prune();
    }

    fn close_and_prune(&mut self) {
        let Some(mut file) = self.file.take() else { return };
        let _ = file.flush();
        drop(file);
        match prune_folder(&self.folder, LOG_RETENTION) {
            Ok(0) => {}
            Ok(deleted) => {
                debug!(deleted, folder = %self.folder.display(), "pruned log folder")
            }
            Err(err) => warn!(%err, "failed to prune log folder"),
        }
    }
}

impl Drop for SessionLog {
    fn drop(&mut self) {
        self.close_and_prune();
    }
}

/// Deletes the oldest files (by modification time) beyond `keep`.
/// Subdirectories and unreadable entries are left alone.
fn prune_folder(folder: &Path, keep: usize) -> std::io::Result<usize> {
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(folder)? {
        let Ok(entry) = entry else { continue };
        let Ok(metadata) = entry.metadata() else { continue };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else { continue };
        files.push((modified, entry.path()));
    }

    if files.len() <= keep {
        return Ok(0);
    }
    files.sort_by_key(|(modified, _)| *modified);
    let excess = files.len() - keep;
    let mut deleted = 0;
    for (_, path) in files.into_iter().take(excess) {
        if fs::remove_file(&path).is_ok() {
            deleted += 1;
        }
    }
    Ok(deleted)
}
