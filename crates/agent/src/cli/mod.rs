pub mod agents;
pub mod chat;
pub mod config;
pub mod history;
pub mod run;
pub mod secret;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use ua_domain::config::{AgentConfig, ConfigOverrides, ReasoningEffort};
use ua_domain::models::ModelId;
use ua_providers::auth::resolve_api_key;
use ua_providers::client::OPENAI_CHAT_URL;
use ua_providers::{ChatClient, ReqwestTransport};
use ua_sessions::config_store::load_or_create;
use ua_sessions::{agents_root, AgentPaths};

use crate::runtime::Agent;

/// Overrides the chat completions endpoint.
pub const API_URL_ENV: &str = "UA_API_URL";

/// unified-agent: a terminal chat client for OpenAI reasoning models.
#[derive(Debug, Parser)]
#[command(name = "unified-agent", version, about)]
pub struct Cli {
    /// Agent to operate on (a directory under the agents root).
    #[arg(long, short = 'a', global = true, default_value = "default")]
    pub agent: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat (default when no subcommand is given).
    Chat {
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Send one message, or every line of a batch file, and print the replies.
    Run {
        /// The message to send.
        message: Option<String>,
        /// File with one message per line; blank lines and `#` comments are skipped.
        #[arg(long, conflicts_with = "message")]
        batch: Option<PathBuf>,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// List all agents.
    List,
    /// List supported models with timeouts and pricing.
    Models,
    /// Show an agent's config, statistics and files.
    Info,
    /// Per-agent configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Export the conversation (json, txt, md, csv).
    Export {
        #[arg(default_value = "json")]
        format: String,
    },
    /// Clear the conversation history (a backup is kept).
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Back up the history now, or list existing backups.
    Backup {
        #[arg(long)]
        list: bool,
    },
    /// Replace the history with a backup.
    Restore {
        /// Backup file name, with or without `.json`.
        backup: String,
    },
    /// Search the history (case-insensitive).
    Search {
        term: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Store an API key in the agent's secrets.json.
    SetKey {
        /// Store the key for this model only.
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the stored config as TOML.
    Show,
    /// Set one config key (e.g. `temperature 0.7`).
    Set { key: String, value: String },
    /// Apply a preset, or list presets when no name is given.
    Preset { name: Option<String> },
}

/// Per-invocation overrides; nothing here is saved.
#[derive(Debug, Clone, Default, Args)]
pub struct OverrideArgs {
    /// Model for this session (o1, o3, o3-mini, o4-mini).
    #[arg(long)]
    pub model: Option<String>,
    /// Reasoning effort (low, medium, high).
    #[arg(long)]
    pub effort: Option<String>,
    #[arg(long)]
    pub temperature: Option<f64>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
    /// Wait for the complete reply instead of streaming.
    #[arg(long)]
    pub no_stream: bool,
    #[arg(long)]
    pub system_prompt: Option<String>,
}

impl OverrideArgs {
    pub fn to_overrides(&self) -> anyhow::Result<ConfigOverrides> {
        let model = self
            .model
            .as_deref()
            .map(str::parse::<ModelId>)
            .transpose()?;
        let reasoning_effort = self
            .effort
            .as_deref()
            .map(str::parse::<ReasoningEffort>)
            .transpose()
            .map_err(|e| anyhow::anyhow!("--effort: {e}"))?;
        Ok(ConfigOverrides {
            model,
            temperature: self.temperature,
            reasoning_effort,
            max_output_tokens: self.max_tokens,
            stream: self.no_stream.then_some(false),
            system_prompt: self.system_prompt.clone(),
            ..ConfigOverrides::default()
        })
    }
}

// ── Agent loading helpers ─────────────────────────────────────────────

pub fn agent_paths(agent_id: &str) -> anyhow::Result<AgentPaths> {
    Ok(AgentPaths::new(&agents_root(), agent_id)?)
}

/// Load the agent's config, creating it with defaults on first use.
pub fn load_agent_config(paths: &AgentPaths) -> anyhow::Result<AgentConfig> {
    paths.ensure_dirs()?;
    load_or_create(&paths.config_file(), AgentConfig::default)
        .with_context(|| format!("loading config for agent '{}'", paths.id()))
}

/// Build the HTTP client, prompting for an API key if none is configured.
pub fn build_client(paths: &AgentPaths, model: ModelId) -> anyhow::Result<ChatClient> {
    let key = match resolve_api_key(&paths.secrets_file(), model.as_str()) {
        Some((key, source)) => {
            tracing::debug!(source = %source, "api key resolved");
            key
        }
        None => secret::prompt_and_store(paths, model)?,
    };
    let transport = ReqwestTransport::new()?;
    let url = std::env::var(API_URL_ENV).unwrap_or_else(|_| OPENAI_CHAT_URL.to_string());
    Ok(ChatClient::new(Arc::new(transport), key).with_url(url))
}

/// Open an agent ready for turns. The key is looked up for `model` when
/// given (a `--model` override), otherwise for the stored model.
pub fn open_agent(paths: AgentPaths, model: Option<ModelId>) -> anyhow::Result<Agent> {
    let config = load_agent_config(&paths)?;
    let client = build_client(&paths, model.unwrap_or(config.model))?;
    Ok(Agent::open(paths, config, client)?)
}

/// Open an agent for commands that never call the API.
pub fn open_offline(paths: AgentPaths) -> anyhow::Result<Agent> {
    let config = load_agent_config(&paths)?;
    let transport = ReqwestTransport::new()?;
    let client = ChatClient::new(Arc::new(transport), String::new());
    Ok(Agent::open(paths, config, client)?)
}

/// Ask a yes/no question on stderr; anything but `y`/`yes` is no.
pub fn confirm(prompt: &str) -> bool {
    use std::io::{BufRead, Write};

    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush().ok();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
