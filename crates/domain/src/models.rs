//! Static catalog of supported reasoning models.
//!
//! The table drives three things at runtime: the request timeout for a given
//! reasoning effort, the ceiling applied to `max_output_tokens`, and cost
//! estimates in exports. It is never mutated.

use crate::config::ReasoningEffort;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timeout used when the effort level is not one of low/medium/high.
pub const FALLBACK_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ModelId {
    #[default]
    #[serde(rename = "o1")]
    O1,
    #[serde(rename = "o3")]
    O3,
    #[serde(rename = "o3-mini")]
    O3Mini,
    #[serde(rename = "o4-mini")]
    O4Mini,
}

impl ModelId {
    pub const ALL: [ModelId; 4] = [ModelId::O1, ModelId::O3, ModelId::O3Mini, ModelId::O4Mini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::O1 => "o1",
            ModelId::O3 => "o3",
            ModelId::O3Mini => "o3-mini",
            ModelId::O4Mini => "o4-mini",
        }
    }

    pub fn profile(&self) -> &'static ModelProfile {
        match self {
            ModelId::O1 => &O1,
            ModelId::O3 => &O3,
            ModelId::O3Mini => &O3_MINI,
            ModelId::O4Mini => &O4_MINI,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> = ModelId::ALL.iter().map(|m| m.as_str()).collect();
                Error::UnsupportedModel(format!("{s} (supported: {})", supported.join(", ")))
            })
    }
}

/// Seconds allowed per request, keyed by reasoning effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutTable {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl TimeoutTable {
    pub fn for_effort(&self, effort: ReasoningEffort) -> u64 {
        match effort {
            ReasoningEffort::Low => self.low,
            ReasoningEffort::Medium => self.medium,
            ReasoningEffort::High => self.high,
        }
    }

    /// Look up by the raw wire value; unknown efforts get the fallback.
    pub fn lookup(&self, effort: &str) -> u64 {
        match effort.parse::<ReasoningEffort>() {
            Ok(e) => self.for_effort(e),
            Err(_) => FALLBACK_TIMEOUT_SECS,
        }
    }
}

/// Pricing per 1K tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    /// Calculate estimated cost in USD for the given token counts.
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_per_1k + output_tokens as f64 * self.output_per_1k)
            / 1_000.0
    }
}

#[derive(Debug, Clone)]
pub struct ModelProfile {
    pub id: ModelId,
    pub name: &'static str,
    pub description: &'static str,
    pub timeouts: TimeoutTable,
    pub context_window: u32,
    pub max_output_tokens: u32,
    pub pricing: ModelPricing,
}

impl ModelProfile {
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        self.pricing.estimate_cost(input_tokens, output_tokens)
    }
}

static O1: ModelProfile = ModelProfile {
    id: ModelId::O1,
    name: "O1",
    description: "Most capable reasoning model for complex problems",
    timeouts: TimeoutTable { low: 180, medium: 480, high: 900 },
    context_window: 128_000,
    max_output_tokens: 65_536,
    pricing: ModelPricing { input_per_1k: 0.015, output_per_1k: 0.06 },
};

static O3: ModelProfile = ModelProfile {
    id: ModelId::O3,
    name: "O3",
    description: "Advanced reasoning with strong performance on hard tasks",
    timeouts: TimeoutTable { low: 240, medium: 600, high: 1200 },
    context_window: 128_000,
    max_output_tokens: 65_536,
    pricing: ModelPricing { input_per_1k: 0.02, output_per_1k: 0.08 },
};

static O3_MINI: ModelProfile = ModelProfile {
    id: ModelId::O3Mini,
    name: "O3 Mini",
    description: "Fast, cost-efficient reasoning for coding and math",
    timeouts: TimeoutTable { low: 120, medium: 300, high: 600 },
    context_window: 128_000,
    max_output_tokens: 65_536,
    pricing: ModelPricing { input_per_1k: 0.0025, output_per_1k: 0.01 },
};

static O4_MINI: ModelProfile = ModelProfile {
    id: ModelId::O4Mini,
    name: "O4 Mini",
    description: "Latest small reasoning model, fastest responses",
    timeouts: TimeoutTable { low: 90, medium: 240, high: 480 },
    context_window: 128_000,
    max_output_tokens: 65_536,
    pricing: ModelPricing { input_per_1k: 0.002, output_per_1k: 0.008 },
};

/// Timeout in seconds for a raw (model, effort) pair as they appear in a
/// request payload.
pub fn timeout_for(model: &str, effort: &str) -> u64 {
    match model.parse::<ModelId>() {
        Ok(id) => id.profile().timeouts.lookup(effort),
        Err(_) => FALLBACK_TIMEOUT_SECS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_table_matches_effort() {
        assert_eq!(timeout_for("o1", "low"), 180);
        assert_eq!(timeout_for("o3", "high"), 1200);
        assert_eq!(timeout_for("o4-mini", "medium"), 240);
    }

    #[test]
    fn unknown_effort_falls_back() {
        assert_eq!(timeout_for("o3-mini", "extreme"), FALLBACK_TIMEOUT_SECS);
        assert_eq!(timeout_for("gpt-4", "low"), FALLBACK_TIMEOUT_SECS);
    }

    #[test]
    fn unsupported_model_rejected() {
        let err = "gpt-4".parse::<ModelId>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel(_)));
        assert!(err.to_string().contains("o3-mini"));
    }

    #[test]
    fn cost_estimate_per_thousand() {
        let cost = ModelId::O1.profile().estimate_cost(1000, 1000);
        assert!((cost - 0.075).abs() < 1e-9);
    }
}
