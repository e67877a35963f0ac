use ua_domain::config::{AgentConfig, ConfigSeverity, Preset};

use crate::runtime::Agent;

/// Dump the stored config (with all defaults filled in) as TOML.
pub fn show(config: &AgentConfig) {
    match toml::to_string_pretty(config) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}

/// `config set KEY VALUE`. Values outside their range are coerced on save
/// and reported.
pub fn set(agent: &mut Agent, key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = agent.config().clone();
    config.set_field(key, value)?;

    let issues = config.clone().coerce();
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    for issue in &issues {
        println!("{issue}");
    }
    if error_count > 0 {
        anyhow::bail!("{error_count} error(s); config not saved");
    }

    agent.set_config(config)?;
    println!("{key} updated for agent '{}'", agent.id());
    Ok(())
}

/// `config preset [NAME]`: apply, or list when no name is given.
pub fn preset(agent: &mut Agent, name: Option<&str>) -> anyhow::Result<()> {
    let Some(name) = name else {
        print_presets();
        return Ok(());
    };
    let preset: Preset = name.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
    agent.apply_preset(preset)?;
    println!("Applied preset '{preset}' to agent '{}'", agent.id());
    Ok(())
}

pub fn print_presets() {
    println!("Presets:");
    for preset in Preset::ALL {
        println!("  {:<10} {}", preset.name(), preset.description());
    }
}

/// One-screen summary used by `info` and `/config`.
pub fn print_summary(config: &AgentConfig) {
    let profile = config.profile();
    println!("Model:             {} ({})", profile.name, config.model);
    println!("Temperature:       {}", config.temperature);
    println!("Top P:             {}", config.top_p);
    println!("Reasoning effort:  {}", config.reasoning_effort);
    println!("Reasoning summary: {}", config.reasoning_summary);
    println!("Verbosity:         {}", config.text_verbosity);
    println!("Response format:   {}", config.text_format);
    match config.effective_max_output_tokens() {
        Some(n) => println!("Max output tokens: {n}"),
        None => println!("Max output tokens: (model default)"),
    }
    println!("Streaming:         {}", config.stream);
    println!("Timeout:           {}s", config.timeout_secs());
    println!("History limit:     {}", config.max_history_size);
    if let Some(prompt) = &config.system_prompt {
        println!("System prompt:     {prompt}");
    }
}
