mod options;
mod presets;

pub use options::*;
pub use presets::*;

use crate::error::{Error, Result};
use crate::models::{ModelId, ModelProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Per-agent config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Stored configuration for one agent (`config.toml` in the agent dir).
///
/// Enumerated options and numeric ranges are coerced to safe values rather
/// than rejected; only an unsupported `model` fails to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub model: ModelId,
    /// Sampling temperature, 0.0..=2.0.
    #[serde(default = "d_one")]
    pub temperature: f64,
    /// Nucleus sampling mass, 0.0..=1.0.
    #[serde(default = "d_one")]
    pub top_p: f64,
    #[serde(default, deserialize_with = "options::lossy")]
    pub reasoning_effort: ReasoningEffort,
    #[serde(default, deserialize_with = "options::lossy")]
    pub reasoning_summary: ReasoningSummary,
    /// Capped at the model's output ceiling when the request is built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default = "d_true")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, deserialize_with = "options::lossy")]
    pub text_format: TextFormat,
    #[serde(default, deserialize_with = "options::lossy")]
    pub text_verbosity: Verbosity,
    #[serde(default = "d_true")]
    pub store: bool,
    /// Upper bound on stored messages; the oldest are dropped first.
    #[serde(default = "d_history_size")]
    pub max_history_size: usize,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            model: ModelId::default(),
            temperature: 1.0,
            top_p: 1.0,
            reasoning_effort: ReasoningEffort::default(),
            reasoning_summary: ReasoningSummary::default(),
            max_output_tokens: None,
            stream: true,
            system_prompt: None,
            text_format: TextFormat::default(),
            text_verbosity: Verbosity::default(),
            store: true,
            max_history_size: DEFAULT_HISTORY_SIZE,
            created_at: now,
            updated_at: now,
        }
    }
}

pub const DEFAULT_HISTORY_SIZE: usize = 1000;

fn d_one() -> f64 {
    1.0
}
fn d_true() -> bool {
    true
}
fn d_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

/// Per-call overrides (CLI flags, REPL switches). `None` means "use stored".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub model: Option<ModelId>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub reasoning_summary: Option<ReasoningSummary>,
    pub max_output_tokens: Option<u32>,
    pub stream: Option<bool>,
    pub system_prompt: Option<String>,
    pub text_format: Option<TextFormat>,
    pub text_verbosity: Option<Verbosity>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        *self == ConfigOverrides::default()
    }
}

impl AgentConfig {
    pub fn for_model(model: ModelId) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn profile(&self) -> &'static ModelProfile {
        self.model.profile()
    }

    /// Output-token limit actually sent, clamped to the model ceiling.
    pub fn effective_max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
            .map(|n| n.min(self.profile().max_output_tokens))
    }

    /// Request timeout in seconds for the configured model and effort.
    pub fn timeout_secs(&self) -> u64 {
        self.profile().timeouts.for_effort(self.reasoning_effort)
    }

    /// Resolve the config used for one request: overrides win over stored
    /// values, stored values win over defaults. The result is coerced.
    pub fn merged(&self, overrides: &ConfigOverrides) -> AgentConfig {
        let mut cfg = self.clone();
        if let Some(m) = overrides.model {
            cfg.model = m;
        }
        if let Some(t) = overrides.temperature {
            cfg.temperature = t;
        }
        if let Some(p) = overrides.top_p {
            cfg.top_p = p;
        }
        if let Some(e) = overrides.reasoning_effort {
            cfg.reasoning_effort = e;
        }
        if let Some(s) = overrides.reasoning_summary {
            cfg.reasoning_summary = s;
        }
        if let Some(n) = overrides.max_output_tokens {
            cfg.max_output_tokens = Some(n);
        }
        if let Some(s) = overrides.stream {
            cfg.stream = s;
        }
        if let Some(ref p) = overrides.system_prompt {
            cfg.system_prompt = Some(p.clone());
        }
        if let Some(f) = overrides.text_format {
            cfg.text_format = f;
        }
        if let Some(v) = overrides.text_verbosity {
            cfg.text_verbosity = v;
        }
        for issue in cfg.coerce() {
            tracing::warn!(field = %issue.field, "{}", issue.message);
        }
        cfg
    }

    /// Fold `overrides` into the stored config permanently.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        let created_at = self.created_at;
        *self = self.merged(overrides);
        self.created_at = created_at;
    }

    /// Clamp out-of-range values in place and report what changed.
    pub fn coerce(&mut self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if !(0.0..=2.0).contains(&self.temperature) {
            issues.push(ConfigIssue::warning(
                "temperature",
                format!("{} outside 0.0-2.0, reset to 1.0", self.temperature),
            ));
            self.temperature = 1.0;
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            issues.push(ConfigIssue::warning(
                "top_p",
                format!("{} outside 0.0-1.0, reset to 1.0", self.top_p),
            ));
            self.top_p = 1.0;
        }

        if self.max_output_tokens == Some(0) {
            issues.push(ConfigIssue::warning(
                "max_output_tokens",
                "0 is not a usable limit, unset".to_string(),
            ));
            self.max_output_tokens = None;
        }

        let ceiling = self.profile().max_output_tokens;
        if let Some(n) = self.max_output_tokens.filter(|n| *n > ceiling) {
            issues.push(ConfigIssue::warning(
                "max_output_tokens",
                format!("{n} exceeds {} limit, capped at {ceiling}", self.model),
            ));
            self.max_output_tokens = Some(ceiling);
        }

        if self.max_history_size == 0 {
            issues.push(ConfigIssue::warning(
                "max_history_size",
                format!("must be at least 1, reset to {DEFAULT_HISTORY_SIZE}"),
            ));
            self.max_history_size = DEFAULT_HISTORY_SIZE;
        }

        if self.system_prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            self.system_prompt = None;
        }

        issues
    }

    /// Set one field from its string form (`config set KEY VALUE`).
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        let bad = |e: String| Error::Config(format!("{key}: {e}"));
        match key {
            "model" => self.model = value.parse()?,
            "temperature" => self.temperature = parse_num(value).map_err(bad)?,
            "top_p" => self.top_p = parse_num(value).map_err(bad)?,
            "reasoning_effort" => self.reasoning_effort = value.parse().map_err(bad)?,
            "reasoning_summary" => self.reasoning_summary = value.parse().map_err(bad)?,
            "text_format" => self.text_format = value.parse().map_err(bad)?,
            "text_verbosity" => self.text_verbosity = value.parse().map_err(bad)?,
            "max_output_tokens" => {
                self.max_output_tokens = match value {
                    "" | "none" => None,
                    v => Some(parse_num(v).map_err(bad)?),
                }
            }
            "max_history_size" => self.max_history_size = parse_num(value).map_err(bad)?,
            "stream" => self.stream = parse_bool(value).map_err(bad)?,
            "store" => self.store = parse_bool(value).map_err(bad)?,
            "system_prompt" => {
                self.system_prompt = match value {
                    "" | "none" => None,
                    v => Some(v.to_string()),
                }
            }
            other => return Err(Error::Config(format!("unknown config key: {other}"))),
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(value: &str) -> std::result::Result<T, String>
where
    T::Err: fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| e.to_string())
}

fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("expected true/false, got {other}")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration issue found (and usually corrected) on load.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn warning(field: &str, message: String) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message,
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}
