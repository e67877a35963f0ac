//! History maintenance commands: export, clear, backup, restore, search.

use ua_domain::message::Message;
use ua_sessions::SearchHit;

use crate::export::ExportFormat;
use crate::runtime::Agent;

use super::agents::file_name;

pub fn export(agent: &Agent, format: &str) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    if agent.history().is_empty() {
        eprintln!("Nothing to export: history is empty.");
        return Ok(());
    }
    let path = agent.export(format)?;
    println!("Exported {} messages to {}", agent.history().len(), path.display());
    Ok(())
}

pub fn clear(agent: &mut Agent, yes: bool) -> anyhow::Result<()> {
    let count = agent.history().len();
    if count == 0 {
        println!("History is already empty.");
        return Ok(());
    }
    if !yes && !super::confirm(&format!("Clear {count} messages from '{}'?", agent.id())) {
        println!("Cancelled.");
        return Ok(());
    }
    agent.clear_history()?;
    println!("Cleared {count} messages (a backup was saved).");
    Ok(())
}

pub fn backup(agent: &Agent, list: bool) -> anyhow::Result<()> {
    if !list {
        let path = agent.backup_history()?;
        println!("Backup written: {}", file_name(&path));
        return Ok(());
    }
    let backups = agent.list_backups()?;
    if backups.is_empty() {
        println!("No backups for '{}'.", agent.id());
    }
    for path in backups {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        println!("{}  ({size} bytes)", file_name(&path));
    }
    Ok(())
}

pub fn restore(agent: &mut Agent, name: &str) -> anyhow::Result<()> {
    let count = agent.restore_backup(name)?;
    println!("Restored {count} messages from {name}");
    Ok(())
}

pub fn search(agent: &Agent, term: &str, limit: usize) {
    let hits = agent.search(term, Some(limit));
    print_hits(term, &hits);
}

pub fn print_hits(term: &str, hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No messages matching '{term}'.");
        return;
    }
    println!("{} match(es) for '{term}':", hits.len());
    for hit in hits {
        println!(
            "  #{:<4} [{}] {}: {}",
            hit.index + 1,
            hit.timestamp.format("%Y-%m-%d %H:%M"),
            hit.role,
            hit.preview
        );
    }
}

/// Last `n` messages, oldest first.
pub fn print_recent(messages: &[Message], n: usize) {
    let start = messages.len().saturating_sub(n);
    for m in &messages[start..] {
        println!(
            "[{}] {}: {}",
            m.timestamp.format("%Y-%m-%d %H:%M:%S"),
            m.role,
            ua_sessions::stats::preview(&m.content)
        );
    }
}
