//! Durable, append-only, size-bounded conversation history.
//!
//! `history.json` holds the whole conversation as a JSON array. Every write
//! first copies the previous file into the backup ring, then replaces the
//! file through a temp file + rename so a crash never leaves half a history.
//!
//! The in-memory log is authoritative for the life of the process: a failed
//! write is logged and the conversation carries on.

use std::path::{Path, PathBuf};

use ua_domain::error::{Error, Result};
use ua_domain::message::{Message, Role};
use ua_domain::trace::TraceEvent;

use crate::backup::BackupRing;

pub struct HistoryStore {
    agent_id: String,
    path: PathBuf,
    backups: BackupRing,
    max_size: usize,
    messages: Vec<Message>,
}

impl HistoryStore {
    /// Load history from `path`.
    ///
    /// A missing file is an empty history. A corrupt file is reported and
    /// also treated as empty; it is not overwritten until the next append,
    /// and that append backs it up first.
    pub fn load(
        agent_id: &str,
        path: impl Into<PathBuf>,
        backups: BackupRing,
        max_size: usize,
    ) -> Self {
        let path = path.into();
        let messages = match read_history_file(&path) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(
                    agent_id = %agent_id,
                    path = %path.display(),
                    error = %e,
                    "history file unreadable, starting empty"
                );
                Vec::new()
            }
        };

        TraceEvent::HistoryLoaded {
            agent_id: agent_id.to_string(),
            messages: messages.len(),
        }
        .emit();

        let mut store = Self {
            agent_id: agent_id.to_string(),
            path,
            backups,
            max_size: max_size.max(1),
            messages,
        };
        store.truncate();
        store
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backups(&self) -> &BackupRing {
        &self.backups
    }

    /// Change the bound. Excess entries are dropped from memory now and from
    /// disk at the next write.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        self.truncate();
    }

    /// Append a message, drop the oldest entries beyond the bound, and
    /// persist. Persistence failures are logged, not returned.
    pub fn append(
        &mut self,
        role: Role,
        content: impl Into<String>,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> &Message {
        let mut message = Message::new(role, content);
        if let Some(metadata) = metadata {
            message = message.with_metadata(metadata);
        }
        self.messages.push(message);
        self.truncate();

        if let Err(e) = self.persist() {
            tracing::error!(agent_id = %self.agent_id, error = %e, "failed to persist history");
        }

        let last = self.messages.len() - 1;
        &self.messages[last]
    }

    /// Back up the current history, then empty it on disk and in memory.
    /// The snapshot taken here is the only one; the write skips the ring.
    pub fn clear(&mut self) -> Result<()> {
        self.backup_now()?;
        self.messages.clear();
        self.write_file()?;
        tracing::info!(agent_id = %self.agent_id, "history cleared");
        Ok(())
    }

    /// Snapshot the in-memory history into the backup ring.
    pub fn backup_now(&self) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(&self.messages)?;
        Ok(self.backups.capture_bytes(&json)?.path)
    }

    /// Replace the history with the contents of a backup file. The current
    /// history is backed up first. Returns the number of restored messages.
    pub fn restore(&mut self, backup: &Path) -> Result<usize> {
        let restored = read_history_file(backup)?;
        self.backup_now()?;
        self.messages = restored;
        self.truncate();
        self.write_file()?;
        tracing::info!(
            agent_id = %self.agent_id,
            backup = %backup.display(),
            messages = self.messages.len(),
            "history restored from backup"
        );
        Ok(self.messages.len())
    }

    /// Write the full history to disk, backing up the previous copy first.
    /// A failed backup is logged and does not block the write.
    pub fn persist(&self) -> Result<()> {
        match self.backups.capture_file(&self.path) {
            Ok(Some(captured)) => TraceEvent::BackupRotated {
                agent_id: self.agent_id.clone(),
                file: captured.path.display().to_string(),
                pruned: captured.pruned,
            }
            .emit(),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(agent_id = %self.agent_id, error = %e, "history backup failed");
            }
        }
        self.write_file()
    }

    fn write_file(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.messages)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| Error::Persistence(format!("writing {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Persistence(format!("replacing {}: {e}", self.path.display())))?;

        TraceEvent::HistoryPersisted {
            agent_id: self.agent_id.clone(),
            messages: self.messages.len(),
        }
        .emit();
        Ok(())
    }

    fn truncate(&mut self) {
        if self.messages.len() <= self.max_size {
            return;
        }
        let excess = self.messages.len() - self.max_size;
        self.messages.drain(..excess);
        tracing::info!(
            agent_id = %self.agent_id,
            removed = excess,
            "history truncated to {} messages",
            self.max_size
        );
        TraceEvent::HistoryTruncated {
            agent_id: self.agent_id.clone(),
            removed: excess,
            retained: self.messages.len(),
        }
        .emit();
    }
}

/// Parse a history file. A missing file is an empty history.
pub fn read_history_file(path: &Path) -> Result<Vec<Message>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path, max: usize) -> HistoryStore {
        HistoryStore::load(
            "test",
            dir.join("history.json"),
            BackupRing::new(dir.join("backups")),
            max,
        )
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(store(tmp.path(), 10).is_empty());
    }

    #[test]
    fn corrupt_file_is_empty_and_backed_up_on_next_write() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("history.json"), "{not json").unwrap();
        let mut s = store(tmp.path(), 10);
        assert!(s.is_empty());

        s.append(Role::User, "hello", None);
        let backups = s.backups().list().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), "{not json");
    }

    #[test]
    fn first_append_creates_no_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = store(tmp.path(), 10);
        s.append(Role::User, "hello", None);
        assert!(s.backups().list().unwrap().is_empty());
        assert!(tmp.path().join("history.json").exists());
        assert!(!tmp.path().join("history.json.tmp").exists());
    }

    #[test]
    fn metadata_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = store(tmp.path(), 10);
        let mut meta = serde_json::Map::new();
        meta.insert("turn_id".into(), "abc".into());
        s.append(Role::Assistant, "hi", Some(meta));

        let reloaded = store(tmp.path(), 10);
        assert_eq!(reloaded.messages()[0].metadata["turn_id"], "abc");
    }

    #[test]
    fn set_max_size_truncates_in_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut s = store(tmp.path(), 10);
        for i in 0..5 {
            s.append(Role::User, format!("m{i}"), None);
        }
        s.set_max_size(2);
        let contents: Vec<&str> = s.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }
}
