//! Per-agent persistent state for unified-agent.
//!
//! Each agent owns a directory with its config, an append-only bounded
//! conversation history, and a ring of history backups.

pub mod backup;
pub mod config_store;
pub mod history;
pub mod paths;
pub mod stats;

pub use backup::{BackupRing, MAX_BACKUPS};
pub use history::HistoryStore;
pub use paths::{agents_root, list_agents, validate_agent_id, AgentPaths};
pub use stats::{search, ConversationStats, SearchHit};
