//! Per-agent runtime: one [`Agent`] owns everything a conversation needs.
//!
//! There is no process-wide state. Two agents never share a history, a
//! config or a client; the CLI builds exactly one.
//!
//! Entry point for a conversation turn: [`Agent::submit`] (see [`turn`]).

pub mod turn;

use std::path::PathBuf;

use ua_domain::config::{AgentConfig, Preset};
use ua_domain::error::{Error, Result};
use ua_providers::ChatClient;
use ua_sessions::config_store::save_config;
use ua_sessions::stats::DEFAULT_SEARCH_LIMIT;
use ua_sessions::{search, AgentPaths, BackupRing, ConversationStats, HistoryStore, SearchHit};

use crate::export::{export_conversation, ExportFormat};
use crate::inclusion::{InclusionResolver, WorkspaceInclusions};

use turn::{emit_phase, PhaseSlot};

pub use turn::TurnPhase;

pub struct Agent {
    paths: AgentPaths,
    config: AgentConfig,
    history: HistoryStore,
    client: ChatClient,
    inclusions: Box<dyn InclusionResolver>,
    phase: PhaseSlot,
}

impl Agent {
    /// Open an agent directory (created if missing) with an already-loaded
    /// config. File inclusion defaults to the current directory plus the
    /// agent's `uploads/`.
    pub fn open(paths: AgentPaths, config: AgentConfig, client: ChatClient) -> Result<Self> {
        paths.ensure_dirs()?;
        let history = HistoryStore::load(
            paths.id(),
            paths.history_file(),
            BackupRing::new(paths.backups_dir()),
            config.max_history_size,
        );
        let inclusions = Box::new(WorkspaceInclusions::new(".", paths.uploads_dir()));

        tracing::info!(
            agent_id = %paths.id(),
            model = %config.model,
            messages = history.len(),
            "agent opened"
        );

        Ok(Self {
            paths,
            config,
            history,
            client,
            inclusions,
            phase: PhaseSlot::default(),
        })
    }

    pub fn with_inclusions(mut self, inclusions: impl InclusionResolver + 'static) -> Self {
        self.inclusions = Box::new(inclusions);
        self
    }

    pub fn id(&self) -> &str {
        self.paths.id()
    }

    pub fn paths(&self) -> &AgentPaths {
        &self.paths
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase.get()
    }

    // ── Configuration ─────────────────────────────────────────────────

    /// Replace the stored config and write it to `config.toml`.
    pub fn set_config(&mut self, mut config: AgentConfig) -> Result<()> {
        config.created_at = self.config.created_at;
        save_config(&self.paths.config_file(), &mut config)?;
        self.history.set_max_size(config.max_history_size);
        self.config = config;
        Ok(())
    }

    /// Rebuild the config from a preset for the current model and save it.
    /// The history bound and system prompt carry over.
    pub fn apply_preset(&mut self, preset: Preset) -> Result<()> {
        let mut config = preset.config_for(self.config.model);
        config.max_history_size = self.config.max_history_size;
        config.system_prompt = self.config.system_prompt.clone();
        self.set_config(config)?;
        tracing::info!(agent_id = %self.id(), preset = %preset, "preset applied");
        Ok(())
    }

    // ── History ───────────────────────────────────────────────────────

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()
    }

    pub fn backup_history(&self) -> Result<PathBuf> {
        let path = self.history.backup_now()?;
        tracing::info!(agent_id = %self.id(), backup = %path.display(), "manual backup");
        Ok(path)
    }

    pub fn list_backups(&self) -> Result<Vec<PathBuf>> {
        self.history.backups().list()
    }

    /// Restore from a backup, named by file name or stem. Returns the number
    /// of restored messages.
    pub fn restore_backup(&mut self, name: &str) -> Result<usize> {
        let path = self
            .history
            .backups()
            .find(name)?
            .ok_or_else(|| Error::Persistence(format!("no backup named {name}")))?;
        self.history.restore(&path)
    }

    pub fn stats(&self) -> ConversationStats {
        ConversationStats::compute(self.history.messages())
    }

    pub fn search(&self, term: &str, limit: Option<usize>) -> Vec<SearchHit> {
        search(
            self.history.messages(),
            term,
            limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        )
    }

    /// Write the conversation to `exports/` and return the file path.
    pub fn export(&self, format: ExportFormat) -> Result<PathBuf> {
        export_conversation(
            &self.paths.exports_dir(),
            self.id(),
            &self.config,
            self.history.messages(),
            format,
        )
    }

    fn set_phase(&self, phase: TurnPhase, turn_id: &str) {
        self.phase.replace(phase);
        emit_phase(self.paths.id(), turn_id, phase);
    }
}
