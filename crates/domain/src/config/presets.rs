use super::{AgentConfig, ReasoningEffort, ReasoningSummary, Verbosity};
use crate::models::ModelId;
use std::fmt;
use std::str::FromStr;

/// Named bundles of sampling and reasoning settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Creative,
    Balanced,
    Focused,
    Fast,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Creative, Preset::Balanced, Preset::Focused, Preset::Fast];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Creative => "creative",
            Preset::Balanced => "balanced",
            Preset::Focused => "focused",
            Preset::Fast => "fast",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::Creative => "High creativity with detailed reasoning",
            Preset::Balanced => "Balanced settings for general use",
            Preset::Focused => "Low temperature, thorough reasoning, concise output",
            Preset::Fast => "Quick responses with minimal reasoning",
        }
    }

    /// Build a fresh config for `model` with this preset's settings.
    ///
    /// Fields the preset does not mention keep their defaults.
    pub fn config_for(&self, model: ModelId) -> AgentConfig {
        let (temperature, effort, summary, verbosity) = match self {
            Preset::Creative => (1.5, ReasoningEffort::High, ReasoningSummary::Detailed, Verbosity::High),
            Preset::Balanced => (1.0, ReasoningEffort::Medium, ReasoningSummary::Auto, Verbosity::Medium),
            Preset::Focused => (0.3, ReasoningEffort::High, ReasoningSummary::Detailed, Verbosity::Low),
            Preset::Fast => (0.7, ReasoningEffort::Low, ReasoningSummary::None, Verbosity::Low),
        };
        AgentConfig {
            model,
            temperature,
            reasoning_effort: effort,
            reasoning_summary: summary,
            text_verbosity: verbosity,
            ..AgentConfig::default()
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown preset: {s} (available: creative, balanced, focused, fast)"))
    }
}
