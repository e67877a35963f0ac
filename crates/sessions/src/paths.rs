//! Per-agent directory layout.
//!
//! ```text
//! <agents_root>/<agent_id>/
//!   config.toml
//!   history.json
//!   secrets.json
//!   backups/history_<timestamp>.json
//!   logs/<YYYY-MM-DD>.log
//!   exports/
//!   uploads/
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use ua_domain::error::{Error, Result};

/// Overrides the default `./agents` root.
pub const AGENTS_DIR_ENV: &str = "UA_AGENTS_DIR";

fn agent_id_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("agent id regex must compile"))
}

pub fn validate_agent_id(id: &str) -> Result<()> {
    if agent_id_regex().is_match(id) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "invalid agent id '{id}': use letters, digits, '-' or '_'"
        )))
    }
}

/// Root directory holding every agent.
pub fn agents_root() -> PathBuf {
    std::env::var_os(AGENTS_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("agents"))
}

#[derive(Debug, Clone)]
pub struct AgentPaths {
    id: String,
    dir: PathBuf,
}

impl AgentPaths {
    pub fn new(root: &Path, id: &str) -> Result<Self> {
        validate_agent_id(id)?;
        Ok(Self {
            id: id.to_string(),
            dir: root.join(id),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join("config.toml")
    }

    pub fn history_file(&self) -> PathBuf {
        self.dir.join("history.json")
    }

    pub fn secrets_file(&self) -> PathBuf {
        self.dir.join("secrets.json")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.dir.join("backups")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    pub fn log_file(&self, date: NaiveDate) -> PathBuf {
        self.logs_dir().join(format!("{}.log", date.format("%Y-%m-%d")))
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.dir.join("exports")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.join("uploads")
    }

    /// Create the agent directory and all subdirectories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.dir.clone(),
            self.backups_dir(),
            self.logs_dir(),
            self.exports_dir(),
            self.uploads_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| Error::Persistence(format!("creating {}: {e}", dir.display())))?;
        }
        Ok(())
    }
}

/// Agent ids found under `root`, sorted. Non-directories and names that are
/// not valid ids are skipped.
pub fn list_agents(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut ids: Vec<String> = std::fs::read_dir(root)?
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| validate_agent_id(name).is_ok())
        .collect();
    ids.sort();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ids() {
        for id in ["coder", "my-agent", "agent_2", "A1"] {
            assert!(validate_agent_id(id).is_ok(), "{id}");
        }
    }

    #[test]
    fn invalid_ids() {
        for id in ["", "../etc", "has space", "dot.name", "slash/name"] {
            assert!(validate_agent_id(id).is_err(), "{id}");
        }
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AgentPaths::new(tmp.path(), "coder").unwrap();
        assert!(!paths.exists());
        paths.ensure_dirs().unwrap();
        assert!(paths.backups_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
        assert!(paths.exports_dir().is_dir());
        assert!(paths.uploads_dir().is_dir());
        assert_eq!(paths.history_file(), tmp.path().join("coder/history.json"));
    }

    #[test]
    fn list_skips_files_and_bad_names() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("beta")).unwrap();
        std::fs::create_dir(tmp.path().join("alpha")).unwrap();
        std::fs::create_dir(tmp.path().join("not valid")).unwrap();
        std::fs::write(tmp.path().join("gamma"), "").unwrap();
        assert_eq!(list_agents(tmp.path()).unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn log_file_named_by_date() {
        let paths = AgentPaths::new(Path::new("agents"), "x").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(paths.log_file(date), PathBuf::from("agents/x/logs/2024-05-06.log"));
    }
}
