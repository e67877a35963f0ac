//! `unified-agent run`: one-shot and batch execution.
//!
//! Sends a message (or each line of a batch file), streams the reply to
//! stdout, and exits. Useful for scripting and piping.

use std::io::Write;
use std::path::Path;

use futures_util::StreamExt;
use ua_domain::config::ConfigOverrides;

use crate::runtime::Agent;

/// Send one message and print the reply.
pub async fn run(agent: &mut Agent, message: &str, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    print_turn(agent, message, overrides).await
}

/// Send every line of `file` in order. Blank lines and lines starting with
/// `#` are skipped.
pub async fn batch(agent: &mut Agent, file: &Path, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", file.display()))?;
    let messages = batch_lines(&raw);
    eprintln!("Processing {} message(s) from {}", messages.len(), file.display());

    for (i, message) in messages.iter().enumerate() {
        eprintln!("\n[{}/{}] > {message}", i + 1, messages.len());
        print_turn(agent, message, overrides).await?;
    }
    eprintln!("\nBatch complete.");
    Ok(())
}

pub(crate) fn batch_lines(raw: &str) -> Vec<&str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

/// Drain one turn to stdout, ending with a newline.
pub(crate) async fn print_turn(
    agent: &mut Agent,
    message: &str,
    overrides: &ConfigOverrides,
) -> anyhow::Result<()> {
    let mut fragments = agent.submit(message, overrides);
    let mut stdout = std::io::stdout();
    while let Some(fragment) = fragments.next().await {
        print!("{fragment}");
        stdout.flush().ok();
    }
    println!();
    Ok(())
}
