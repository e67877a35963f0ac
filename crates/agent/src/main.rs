use chrono::Local;
use clap::Parser;

use ua_agent::cli::{self, Cli, Command, ConfigCommand, OverrideArgs};
use ua_agent::logging::init_cli_tracing;
use ua_sessions::{agents_root, AgentPaths};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::List) => {
            init_cli_tracing(None);
            cli::agents::list(&agents_root())
        }
        Some(Command::Models) => {
            cli::agents::models();
            Ok(())
        }
        command => {
            let paths = cli::agent_paths(&cli.agent)?;
            init_agent_tracing(&paths);
            run_agent_command(paths, command).await
        }
    }
}

/// Log to stderr and to the agent's `logs/<today>.log`.
fn init_agent_tracing(paths: &AgentPaths) {
    let log_file = paths.log_file(Local::now().date_naive());
    init_cli_tracing(Some(&log_file));
}

async fn run_agent_command(paths: AgentPaths, command: Option<Command>) -> anyhow::Result<()> {
    match command {
        // Default to chat when no subcommand is given.
        None => chat(paths, OverrideArgs::default()).await,
        Some(Command::Chat { overrides }) => chat(paths, overrides).await,
        Some(Command::Run { message, batch, overrides }) => {
            let resolved = overrides.to_overrides()?;
            let mut agent = cli::open_agent(paths, resolved.model)?;
            match (message, batch) {
                (_, Some(file)) => cli::run::batch(&mut agent, &file, &resolved).await,
                (Some(message), None) => cli::run::run(&mut agent, &message, &resolved).await,
                (None, None) => anyhow::bail!("run needs a MESSAGE or --batch FILE"),
            }
        }
        Some(Command::Info) => cli::agents::info(&cli::open_offline(paths)?),
        Some(Command::Config(ConfigCommand::Show)) => {
            cli::config::show(&cli::load_agent_config(&paths)?);
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Set { key, value })) => {
            cli::config::set(&mut cli::open_offline(paths)?, &key, &value)
        }
        Some(Command::Config(ConfigCommand::Preset { name })) => {
            cli::config::preset(&mut cli::open_offline(paths)?, name.as_deref())
        }
        Some(Command::Export { format }) => cli::history::export(&cli::open_offline(paths)?, &format),
        Some(Command::Clear { yes }) => cli::history::clear(&mut cli::open_offline(paths)?, yes),
        Some(Command::Backup { list }) => cli::history::backup(&cli::open_offline(paths)?, list),
        Some(Command::Restore { backup }) => {
            cli::history::restore(&mut cli::open_offline(paths)?, &backup)
        }
        Some(Command::Search { term, limit }) => {
            cli::history::search(&cli::open_offline(paths)?, &term, limit);
            Ok(())
        }
        Some(Command::SetKey { model }) => cli::secret::set_key(&paths, model.as_deref()),
        Some(Command::List) | Some(Command::Models) => Ok(()),
    }
}

async fn chat(paths: AgentPaths, overrides: OverrideArgs) -> anyhow::Result<()> {
    let resolved = overrides.to_overrides()?;
    let mut agent = cli::open_agent(paths, resolved.model)?;
    cli::chat::chat(&mut agent, resolved).await
}
