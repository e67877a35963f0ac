//! `unified-agent set-key` and the first-run key prompt.

use ua_domain::models::ModelId;
use ua_providers::auth::{mask_api_key, save_api_key, validate_api_key, API_KEY_ENV};
use ua_sessions::AgentPaths;

const MAX_PROMPTS: usize = 3;

/// Prompt for a key (hidden input), validate it and save it to the agent's
/// `secrets.json` as the default key.
pub fn prompt_and_store(paths: &AgentPaths, model: ModelId) -> anyhow::Result<String> {
    let profile = model.profile();
    eprintln!("API key not found for {}.", profile.name);
    eprintln!("Set {API_KEY_ENV} or enter a key now; it is stored in the agent's secrets.json.");
    eprintln!(
        "Pricing: input ${:.4} / output ${:.4} per 1K tokens",
        profile.pricing.input_per_1k, profile.pricing.output_per_1k
    );

    let key = read_valid_key()?;
    paths.ensure_dirs()?;
    save_api_key(&paths.secrets_file(), &key, None)?;
    eprintln!("Saved key {} to {}", mask_api_key(&key), paths.secrets_file().display());
    Ok(key)
}

/// `set-key [--model M]`.
pub fn set_key(paths: &AgentPaths, model: Option<&str>) -> anyhow::Result<()> {
    let model = model.map(str::parse::<ModelId>).transpose()?;
    let key = read_valid_key()?;
    paths.ensure_dirs()?;
    save_api_key(&paths.secrets_file(), &key, model.map(|m| m.as_str()))?;
    match model {
        Some(m) => println!("Stored key {} for {m}", mask_api_key(&key)),
        None => println!("Stored default key {}", mask_api_key(&key)),
    }
    Ok(())
}

fn read_valid_key() -> anyhow::Result<String> {
    for _ in 0..MAX_PROMPTS {
        let key = rpassword::prompt_password_stderr("OpenAI API key: ")?;
        let key = key.trim().to_string();
        if key.is_empty() {
            eprintln!("\x1B[31merror: API key is required\x1B[0m");
            continue;
        }
        match validate_api_key(&key) {
            Ok(()) => return Ok(key),
            Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
        }
    }
    anyhow::bail!("no valid API key entered")
}
