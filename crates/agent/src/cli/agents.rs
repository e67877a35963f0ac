//! `list`, `models` and `info`.

use std::path::Path;

use ua_domain::models::ModelId;
use ua_sessions::config_store::load_config;
use ua_sessions::history::read_history_file;
use ua_sessions::stats::format_duration;
use ua_sessions::{list_agents, AgentPaths};

use crate::runtime::Agent;

/// Print every agent under `root` with its model and history size.
pub fn list(root: &Path) -> anyhow::Result<()> {
    let ids = list_agents(root)?;
    if ids.is_empty() {
        println!("No agents under {}", root.display());
        return Ok(());
    }

    println!("{:<20} {:<8} {:>9} {:>7}  {}", "AGENT", "MODEL", "MESSAGES", "LIMIT", "UPDATED");
    for id in ids {
        let paths = AgentPaths::new(root, &id)?;
        let messages = read_history_file(&paths.history_file())
            .map(|m| m.len().to_string())
            .unwrap_or_else(|_| "?".into());
        match load_config(&paths.config_file()) {
            Ok(Some((config, _))) => println!(
                "{:<20} {:<8} {:>9} {:>7}  {}",
                id,
                config.model.as_str(),
                messages,
                config.max_history_size,
                config.updated_at.format("%Y-%m-%d %H:%M"),
            ),
            Ok(None) => println!("{id:<20} {:<8} {messages:>9}", "-"),
            Err(e) => println!("{id:<20} \x1B[31m{e}\x1B[0m"),
        }
    }
    Ok(())
}

pub fn models() {
    for id in ModelId::ALL {
        let p = id.profile();
        println!("{} ({})", p.name, id);
        println!("  {}", p.description);
        println!(
            "  timeouts: low {}s / medium {}s / high {}s",
            p.timeouts.low, p.timeouts.medium, p.timeouts.high
        );
        println!(
            "  context {} tokens, max output {} tokens",
            p.context_window, p.max_output_tokens
        );
        println!(
            "  pricing: ${:.4} input / ${:.4} output per 1K tokens",
            p.pricing.input_per_1k, p.pricing.output_per_1k
        );
    }
}

pub fn info(agent: &Agent) -> anyhow::Result<()> {
    println!("Agent: {}", agent.id());
    println!("Directory: {}", agent.paths().dir().display());
    println!();
    super::config::print_summary(agent.config());
    println!();
    print_stats(agent);
    println!();

    let backups = agent.list_backups()?;
    println!("Backups: {}", backups.len());
    if let Some(latest) = backups.last() {
        println!("  latest: {}", file_name(latest));
    }
    let exports = std::fs::read_dir(agent.paths().exports_dir())
        .map(|entries| entries.flatten().count())
        .unwrap_or(0);
    println!("Exports: {exports}");
    Ok(())
}

pub fn print_stats(agent: &Agent) {
    let stats = agent.stats();
    println!("Messages:      {} ({} user, {} assistant)", stats.total_messages, stats.user_messages, stats.assistant_messages);
    println!("Characters:    {}", stats.total_chars);
    println!("Average chars: {:.1}", stats.average_length);
    if let (Some(first), Some(last)) = (stats.first_message, stats.last_message) {
        println!("First:         {}", first.format("%Y-%m-%d %H:%M:%S"));
        println!("Last:          {}", last.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(duration) = stats.duration() {
        println!("Duration:      {}", format_duration(duration));
    }
    let tokens = stats.estimated_tokens();
    let cost = agent.config().profile().estimate_cost(tokens / 2, tokens / 2);
    println!("Est. tokens:   ~{tokens} (~${cost:.4})");
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
