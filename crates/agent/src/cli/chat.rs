//! `unified-agent chat`: interactive REPL command.
//!
//! Opens a readline-based loop that sends each line to the agent and
//! streams the reply back. Slash-commands cover history, config, presets,
//! export and file listing.

use rustyline::DefaultEditor;
use ua_domain::config::{ConfigOverrides, Preset};
use ua_domain::models::ModelId;

use crate::inclusion::WorkspaceInclusions;
use crate::runtime::Agent;

use super::{agents, config, history, run};

const DEFAULT_HISTORY_LINES: usize = 10;
const MAX_FILES_SHOWN: usize = 50;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive chat REPL until `/quit` or Ctrl+D.
pub async fn chat(agent: &mut Agent, mut overrides: ConfigOverrides) -> anyhow::Result<()> {
    // Readline input history, separate from the conversation history.
    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".unified-agent")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    let model = overrides.model.unwrap_or(agent.config().model);
    eprintln!("unified-agent chat  |  {} ({})", model.profile().name, model);
    eprintln!(
        "Agent: {}  |  {} messages  |  Type /help for commands, Ctrl+D to exit",
        agent.id(),
        agent.history().len()
    );
    eprintln!("Include files with {{filename}}.");
    eprintln!();

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    if handle_slash_command(trimmed, agent, &mut overrides, &mut rl) {
                        break;
                    }
                    continue;
                }

                print!("assistant> ");
                if let Err(e) = run::print_turn(agent, trimmed, &overrides).await {
                    eprintln!("\x1B[31merror: {e}\x1B[0m");
                }
                println!();
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command. Returns `true` if the REPL should exit.
fn handle_slash_command(
    input: &str,
    agent: &mut Agent,
    overrides: &mut ConfigOverrides,
    rl: &mut DefaultEditor,
) -> bool {
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).filter(|s| !s.is_empty());

    match cmd {
        "/exit" | "/quit" | "/q" => return true,

        "/help" => print_help(),

        "/history" => {
            let n = match arg.map(str::parse::<usize>) {
                None => DEFAULT_HISTORY_LINES,
                Some(Ok(n)) => n,
                Some(Err(_)) => {
                    eprintln!("Usage: /history [count]");
                    return false;
                }
            };
            history::print_recent(agent.history().messages(), n);
        }

        "/search" => match arg {
            Some(term) => history::search(agent, term, 10),
            None => eprintln!("Usage: /search <term>"),
        },

        "/stats" => agents::print_stats(agent),

        "/config" => config::print_summary(&agent.config().merged(overrides)),

        "/preset" => match arg {
            None => config::print_presets(),
            Some(name) => match name.parse::<Preset>() {
                Ok(preset) => match agent.apply_preset(preset) {
                    Ok(()) => eprintln!("Preset '{preset}' applied and saved."),
                    Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
                },
                Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
            },
        },

        "/export" => {
            if let Err(e) = history::export(agent, arg.unwrap_or("json")) {
                eprintln!("\x1B[31merror: {e}\x1B[0m");
            }
        }

        "/clear" => {
            let count = agent.history().len();
            let answer = rl
                .readline(&format!("Clear {count} messages? [y/N] "))
                .unwrap_or_default();
            if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
                match agent.clear_history() {
                    Ok(()) => eprintln!("History cleared (backup saved)."),
                    Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
                }
            } else {
                eprintln!("Cancelled.");
            }
        }

        "/backup" => match agent.backup_history() {
            Ok(path) => eprintln!("Backup written: {}", agents::file_name(&path)),
            Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
        },

        "/files" => print_files(agent),

        "/model" => match arg {
            Some(name) => match name.parse::<ModelId>() {
                Ok(model) => {
                    overrides.model = Some(model);
                    eprintln!("Model set to {} for this session.", model.profile().name);
                }
                Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
            },
            None => {
                let current = overrides.model.unwrap_or(agent.config().model);
                eprintln!("Current model: {current}");
                let names: Vec<&str> = ModelId::ALL.iter().map(|m| m.as_str()).collect();
                eprintln!("Usage: /model <{}>", names.join("|"));
            }
        },

        other => {
            eprintln!("Unknown command: {other}. Type /help for a list.");
        }
    }

    false
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  /help             Show this help");
    eprintln!("  /history [n]      Show the last n messages (default {DEFAULT_HISTORY_LINES})");
    eprintln!("  /search <term>    Search the conversation");
    eprintln!("  /stats            Conversation statistics");
    eprintln!("  /config           Effective settings for this session");
    eprintln!("  /preset [name]    List presets, or apply one");
    eprintln!("  /model [name]     Show or switch the model for this session");
    eprintln!("  /export [fmt]     Export (json, txt, md, csv)");
    eprintln!("  /backup           Back up the history now");
    eprintln!("  /clear            Clear the history (asks first)");
    eprintln!("  /files            Files available for {{filename}} inclusion");
    eprintln!("  /quit             Exit (also /exit, /q, Ctrl+D)");
}

fn print_files(agent: &Agent) {
    let files = WorkspaceInclusions::new(".", agent.paths().uploads_dir()).list_files();
    if files.is_empty() {
        eprintln!("No includable files found.");
        return;
    }
    eprintln!("Includable files ({}):", files.len());
    for file in files.iter().take(MAX_FILES_SHOWN) {
        let status = if file.too_large { "x" } else { "ok" };
        let modified = file
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        eprintln!(
            "  [{status:>2}] {} ({}) [{}] {modified}",
            file.path.display(),
            file.size_label(),
            file.extension()
        );
    }
    if files.len() > MAX_FILES_SHOWN {
        eprintln!("  ... and {} more", files.len() - MAX_FILES_SHOWN);
    }
}
