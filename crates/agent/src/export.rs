//! Conversation export to `exports/conversation_<timestamp>.<ext>`.
//!
//! Exports read an immutable snapshot (config, messages, statistics) and
//! never touch the live history.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Local, Utc};
use serde_json::json;

use ua_domain::config::AgentConfig;
use ua_domain::error::{Error, Result};
use ua_domain::message::{Message, Role};
use ua_sessions::stats::preview;
use ua_sessions::ConversationStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Txt,
    Md,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Txt,
        ExportFormat::Md,
        ExportFormat::Csv,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Txt => "txt",
            ExportFormat::Md => "md",
            ExportFormat::Csv => "csv",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        let wanted = match wanted.as_str() {
            "markdown" => "md",
            "text" => "txt",
            other => other,
        };
        ExportFormat::ALL
            .into_iter()
            .find(|f| f.extension() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = ExportFormat::ALL.iter().map(|f| f.extension()).collect();
                Error::Config(format!(
                    "unsupported export format '{s}' (supported: {})",
                    names.join(", ")
                ))
            })
    }
}

/// Render and write one export file; returns its path.
pub fn export_conversation(
    dir: &Path,
    agent_id: &str,
    config: &AgentConfig,
    messages: &[Message],
    format: ExportFormat,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Persistence(format!("creating {}: {e}", dir.display())))?;

    let body = render(agent_id, config, messages, format)?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let ext = format.extension();
    let mut target = dir.join(format!("conversation_{stamp}.{ext}"));
    let mut n = 1;
    while target.exists() {
        target = dir.join(format!("conversation_{stamp}_{n}.{ext}"));
        n += 1;
    }

    std::fs::write(&target, body)
        .map_err(|e| Error::Persistence(format!("writing {}: {e}", target.display())))?;
    tracing::info!(agent_id = %agent_id, format = %format, path = %target.display(), "conversation exported");
    Ok(target)
}

pub fn render(
    agent_id: &str,
    config: &AgentConfig,
    messages: &[Message],
    format: ExportFormat,
) -> Result<String> {
    Ok(match format {
        ExportFormat::Json => render_json(agent_id, config, messages)?,
        ExportFormat::Txt => render_txt(agent_id, config, messages),
        ExportFormat::Md => render_markdown(agent_id, config, messages),
        ExportFormat::Csv => render_csv(agent_id, config, messages),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Renderers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn render_json(agent_id: &str, config: &AgentConfig, messages: &[Message]) -> Result<String> {
    let stats = ConversationStats::compute(messages);
    let user_chars: usize = messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.chars().count())
        .sum();
    let assistant_chars = stats.total_chars - user_chars;
    let cost = config
        .profile()
        .estimate_cost((user_chars / 4) as u32, (assistant_chars / 4) as u32);

    let doc = json!({
        "export_info": {
            "version": "2.0",
            "exported_at": Utc::now().to_rfc3339(),
            "format": "json",
        },
        "agent_info": {
            "agent_id": agent_id,
            "model": config.model.as_str(),
            "config": config,
        },
        "conversation": {
            "messages": messages,
            "statistics": stats,
        },
        "metadata": {
            "total_tokens_estimate": stats.estimated_tokens(),
            "estimated_cost_usd": cost,
        },
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn render_txt(agent_id: &str, config: &AgentConfig, messages: &[Message]) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{} Conversation Export", config.profile().name);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Agent ID: {agent_id}");
    let _ = writeln!(out, "Model: {}", config.model);
    let _ = writeln!(out, "Exported: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "{rule}\n");

    for m in messages {
        let _ = writeln!(out, "[{}] {}:", local_time(m), m.role.as_str().to_uppercase());
        let _ = writeln!(out, "{}", "-".repeat(40));
        let _ = writeln!(out, "{}\n", m.content);
    }
    out
}

fn render_markdown(agent_id: &str, config: &AgentConfig, messages: &[Message]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} Conversation\n", config.profile().name);
    let _ = writeln!(out, "**Agent ID:** `{agent_id}`  ");
    let _ = writeln!(out, "**Model:** `{}`  ", config.model);
    let _ = writeln!(out, "**Exported:** {}  \n", Local::now().format("%Y-%m-%d %H:%M:%S"));

    if !messages.is_empty() {
        let _ = writeln!(out, "## Contents\n");
        for (i, m) in messages.iter().enumerate() {
            let n = i + 1;
            let first_line = preview(m.content.lines().next().unwrap_or_default());
            let _ = writeln!(
                out,
                "{n}. [{} - {}](#message-{n}) - {first_line}",
                title(m.role),
                local_time(m)
            );
        }
        let _ = writeln!(out, "\n---\n");
    }

    for (i, m) in messages.iter().enumerate() {
        let n = i + 1;
        let _ = writeln!(out, "## {} <a id=\"message-{n}\"></a>\n", title(m.role));
        let _ = writeln!(out, "**Time:** {}  ", local_time(m));
        let _ = writeln!(out, "**Length:** {} characters  \n", m.content.chars().count());
        match m.role {
            Role::User => {
                for line in m.content.lines() {
                    if line.trim().is_empty() {
                        let _ = writeln!(out, ">");
                    } else {
                        let _ = writeln!(out, "> {line}");
                    }
                }
                let _ = writeln!(out);
            }
            Role::Assistant => {
                let _ = writeln!(out, "{}\n", m.content);
            }
        }
        let _ = writeln!(out, "---\n");
    }
    out
}

fn render_csv(agent_id: &str, config: &AgentConfig, messages: &[Message]) -> String {
    let mut out = String::from(
        "Timestamp,Role,Content,Character_Count,Word_Count,Message_Index,Agent_ID,Model\r\n",
    );
    for (i, m) in messages.iter().enumerate() {
        let flat = m.content.replace(['\r', '\n'], " ");
        let row = [
            m.timestamp.to_rfc3339(),
            m.role.as_str().to_string(),
            csv_field(&flat),
            m.content.chars().count().to_string(),
            flat.split_whitespace().count().to_string(),
            (i + 1).to_string(),
            csv_field(agent_id),
            config.model.as_str().to_string(),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn local_time(m: &Message) -> String {
    m.timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn title(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Message> {
        vec![
            Message::new(Role::User, "Hello, \"world\"\nsecond line"),
            Message::new(Role::Assistant, "Hi there"),
        ]
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("markdown".parse::<ExportFormat>().unwrap(), ExportFormat::Md);
        assert!("html".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn json_export_carries_config_and_stats() {
        let text = render("a1", &AgentConfig::default(), &sample(), ExportFormat::Json).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["agent_info"]["agent_id"], "a1");
        assert_eq!(doc["agent_info"]["model"], "o1");
        assert_eq!(doc["conversation"]["messages"].as_array().unwrap().len(), 2);
        assert_eq!(doc["conversation"]["statistics"]["total_messages"], 2);
        assert!(doc["metadata"]["total_tokens_estimate"].as_u64().is_some());
    }

    #[test]
    fn csv_quotes_and_flattens() {
        let text = render("a1", &AgentConfig::default(), &sample(), ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert!(lines[0].starts_with("Timestamp,Role,Content"));
        assert!(lines[1].contains(",user,\"Hello, \"\"world\"\" second line\","));
        assert!(lines[2].contains(",assistant,Hi there,8,2,2,a1,o1"));
    }

    #[test]
    fn markdown_quotes_user_lines() {
        let text = render("a1", &AgentConfig::default(), &sample(), ExportFormat::Md).unwrap();
        assert!(text.contains("> Hello, \"world\"\n> second line\n"));
        assert!(text.contains("## Assistant <a id=\"message-2\"></a>"));
    }

    #[test]
    fn export_writes_into_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let first = export_conversation(
            tmp.path(),
            "a1",
            &AgentConfig::default(),
            &sample(),
            ExportFormat::Txt,
        )
        .unwrap();
        let second = export_conversation(
            tmp.path(),
            "a1",
            &AgentConfig::default(),
            &sample(),
            ExportFormat::Txt,
        )
        .unwrap();
        assert_ne!(first, second);
        let text = std::fs::read_to_string(first).unwrap();
        assert!(text.contains("Agent ID: a1"));
        assert!(text.contains("ASSISTANT:\n"));
    }
}
