//! Bounded ring of timestamped history snapshots.
//!
//! Snapshot names embed the capture time with microsecond precision, so
//! lexical order is chronological order and pruning can work on names alone.

use std::path::{Path, PathBuf};

use chrono::Utc;
use ua_domain::error::{Error, Result};

pub const MAX_BACKUPS: usize = 10;

const PREFIX: &str = "history_";
const SUFFIX: &str = ".json";

/// A snapshot just written, and how many old ones it pushed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub path: PathBuf,
    pub pruned: usize,
}

#[derive(Debug, Clone)]
pub struct BackupRing {
    dir: PathBuf,
    capacity: usize,
}

impl BackupRing {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            capacity: MAX_BACKUPS,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the ring if it exists.
    pub fn capture_file(&self, source: &Path) -> Result<Option<Captured>> {
        if !source.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(source)?;
        self.capture_bytes(&bytes).map(Some)
    }

    /// Write `bytes` as a new snapshot, then prune to capacity.
    pub fn capture_bytes(&self, bytes: &[u8]) -> Result<Captured> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Persistence(format!("creating {}: {e}", self.dir.display())))?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f").to_string();
        let mut target = self.dir.join(format!("{PREFIX}{stamp}{SUFFIX}"));
        let mut n = 1;
        while target.exists() {
            target = self.dir.join(format!("{PREFIX}{stamp}_{n}{SUFFIX}"));
            n += 1;
        }

        std::fs::write(&target, bytes)
            .map_err(|e| Error::Persistence(format!("writing {}: {e}", target.display())))?;
        let pruned = self.prune()?;
        tracing::debug!(backup = %target.display(), pruned, "history backup written");
        Ok(Captured {
            path: target,
            pruned,
        })
    }

    /// Snapshots, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(SUFFIX))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list()?.pop())
    }

    /// Find a snapshot by file name (with or without `.json`).
    pub fn find(&self, name: &str) -> Result<Option<PathBuf>> {
        Ok(self.list()?.into_iter().find(|p| {
            p.file_name().and_then(|n| n.to_str()).is_some_and(|n| {
                n == name || n.strip_suffix(SUFFIX) == Some(name)
            })
        }))
    }

    /// Delete the oldest snapshots until at most `capacity` remain.
    /// Returns how many were removed.
    pub fn prune(&self) -> Result<usize> {
        let files = self.list()?;
        let excess = files.len().saturating_sub(self.capacity);
        for old in &files[..excess] {
            std::fs::remove_file(old)
                .map_err(|e| Error::Persistence(format!("removing {}: {e}", old.display())))?;
        }
        Ok(excess)
    }
}
