use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Detects modification-time edges of a single file by polling.
#[derive(Debug)]
pub struct ChangeWatcher {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl ChangeWatcher {
    /// Primed with the current modification time, so an untouched file never fires.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_seen = modified(&path);
        if last_seen.is_none() {
            log::warn!("{} is not readable yet, waiting for it", path.display());
        }
        Self { path, last_seen }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the new modification time when it differs from the last one observed.
    pub fn poll(&mut self) -> Option<SystemTime> {
        let current = modified(&self.path)?;
        if self.last_seen == Some(current) {
            return None;
        }
        self.last_seen = Some(current);
        Some(current)
    }

    /// Forget the last observed time so the next successful poll fires again.
    pub fn rearm(&mut self) {
        self.last_seen = None;
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(time) => Some(time),
        Err(e) => {
            log::debug!("Cannot read modification time of {}: {}", path.display(), e);
            None
        }
    }
}
