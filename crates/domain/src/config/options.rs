use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Enumerated request options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generates `as_str`, `Display`, `FromStr` and an `ALL` list for a
/// unit-only option enum whose wire form is a fixed string.
macro_rules! wire_enum {
    ($ty:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok($ty::$variant),)+
                    other => Err(format!("invalid {}: {other}", stringify!($ty))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

wire_enum!(ReasoningEffort { Low => "low", Medium => "medium", High => "high" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningSummary {
    #[default]
    Auto,
    Detailed,
    None,
}

wire_enum!(ReasoningSummary { Auto => "auto", Detailed => "detailed", None => "none" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    #[default]
    Text,
    JsonObject,
}

wire_enum!(TextFormat { Text => "text", JsonObject => "json_object" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    #[default]
    Medium,
    High,
}

wire_enum!(Verbosity { Low => "low", Medium => "medium", High => "high" });

/// Deserialize an option enum, falling back to its default on any value it
/// does not recognize. Stored configs are never rejected for these fields.
pub(crate) fn lossy<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String> + Default + fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    Ok(match raw.parse::<T>() {
        Ok(v) => v,
        Err(e) => {
            let fallback = T::default();
            tracing::warn!(value = %raw, fallback = %fallback, "{e}, using default");
            fallback
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<ReasoningEffort>().unwrap(), ReasoningEffort::High);
        assert_eq!(" json_object ".parse::<TextFormat>().unwrap(), TextFormat::JsonObject);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("extreme".parse::<ReasoningEffort>().is_err());
        assert!("verbose".parse::<ReasoningSummary>().is_err());
    }

    #[test]
    fn lossy_falls_back_to_default() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(deserialize_with = "lossy")]
            effort: ReasoningEffort,
        }
        let p: Probe = serde_json::from_str(r#"{"effort":"ultra"}"#).unwrap();
        assert_eq!(p.effort, ReasoningEffort::Medium);
    }
}
