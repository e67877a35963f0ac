//! Conversation statistics and substring search over a history.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use ua_domain::message::{Message, Role};

const MAX_PREVIEW_LEN: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub total_chars: usize,
    pub average_length: f64,
    pub first_message: Option<DateTime<Utc>>,
    pub last_message: Option<DateTime<Utc>>,
}

impl ConversationStats {
    pub fn compute(messages: &[Message]) -> Self {
        let user_messages = messages.iter().filter(|m| m.role == Role::User).count();
        let total_chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
        let average_length = if messages.is_empty() {
            0.0
        } else {
            total_chars as f64 / messages.len() as f64
        };
        Self {
            total_messages: messages.len(),
            user_messages,
            assistant_messages: messages.len() - user_messages,
            total_chars,
            average_length,
            first_message: messages.first().map(|m| m.timestamp),
            last_message: messages.last().map(|m| m.timestamp),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        Some(self.last_message? - self.first_message?)
    }

    /// Rough token estimate (4 chars per token), used for cost hints.
    pub fn estimated_tokens(&self) -> u32 {
        (self.total_chars / 4) as u32
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Position in the history, zero-based.
    pub index: usize,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    /// Message content, truncated to a short preview.
    pub preview: String,
}

/// Case-insensitive substring search, oldest match first, at most `limit`.
pub fn search(messages: &[Message], term: &str, limit: usize) -> Vec<SearchHit> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.content.to_lowercase().contains(&needle))
        .take(limit)
        .map(|(index, m)| SearchHit {
            index,
            role: m.role,
            timestamp: m.timestamp,
            preview: preview(&m.content),
        })
        .collect()
}

pub fn preview(content: &str) -> String {
    if content.chars().count() <= MAX_PREVIEW_LEN {
        content.to_string()
    } else {
        let cut: String = content.chars().take(MAX_PREVIEW_LEN).collect();
        format!("{cut}...")
    }
}

/// `1h 02m 03s` style rendering.
pub fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, content: &str, secs: i64) -> Message {
        let mut m = Message::new(role, content);
        m.timestamp = DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap();
        m
    }

    #[test]
    fn stats_for_empty_history() {
        let stats = ConversationStats::compute(&[]);
        assert_eq!(stats.total_messages, 0);
        assert_eq!(stats.average_length, 0.0);
        assert!(stats.duration().is_none());
    }

    #[test]
    fn stats_count_roles_and_chars() {
        let history = vec![
            msg(Role::User, "abcd", 0),
            msg(Role::Assistant, "ef", 30),
            msg(Role::User, "", 90),
        ];
        let stats = ConversationStats::compute(&history);
        assert_eq!(stats.user_messages, 2);
        assert_eq!(stats.assistant_messages, 1);
        assert_eq!(stats.total_chars, 6);
        assert_eq!(stats.average_length, 2.0);
        assert_eq!(stats.duration(), Some(Duration::seconds(90)));
    }

    #[test]
    fn search_is_case_insensitive_and_limited() {
        let history: Vec<Message> = (0..5)
            .map(|i| msg(Role::User, &format!("Rust question {i}"), i))
            .collect();
        let hits = search(&history, "RUST", 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].index, 0);
        assert_eq!(hits[2].index, 2);
        assert!(search(&history, "python", 10).is_empty());
        assert!(search(&history, "", 10).is_empty());
    }

    #[test]
    fn long_content_previewed() {
        let long = "x".repeat(150);
        let p = preview(&long);
        assert_eq!(p.len(), 103);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn durations_render_compactly() {
        assert_eq!(format_duration(Duration::seconds(5)), "5s");
        assert_eq!(format_duration(Duration::seconds(65)), "1m 05s");
        assert_eq!(format_duration(Duration::seconds(3723)), "1h 02m 03s");
    }
}
