//! Load and save an agent's `config.toml`.

use std::path::Path;

use chrono::Utc;
use ua_domain::config::{AgentConfig, ConfigIssue};
use ua_domain::error::{Error, Result};

/// Read a stored config. `Ok(None)` when the file does not exist.
///
/// Out-of-range values are coerced and returned as issues; an unsupported
/// model is an error.
pub fn load_config(path: &Path) -> Result<Option<(AgentConfig, Vec<ConfigIssue>)>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let mut config: AgentConfig = toml::from_str(&raw)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
    let issues = config.coerce();
    for issue in &issues {
        tracing::warn!(path = %path.display(), "{issue}");
    }
    Ok(Some((config, issues)))
}

/// Load the stored config, or create and save `fallback` if none exists.
pub fn load_or_create(path: &Path, fallback: impl FnOnce() -> AgentConfig) -> Result<AgentConfig> {
    match load_config(path)? {
        Some((config, _)) => Ok(config),
        None => {
            let mut config = fallback();
            save_config(path, &mut config)?;
            tracing::info!(path = %path.display(), model = %config.model, "created agent config");
            Ok(config)
        }
    }
}

/// Write `config` atomically, refreshing `updated_at`.
pub fn save_config(path: &Path, config: &mut AgentConfig) -> Result<()> {
    config.coerce();
    config.updated_at = Utc::now();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(config)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, text)
        .map_err(|e| Error::Persistence(format!("writing {}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| Error::Persistence(format!("replacing {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ua_domain::models::ModelId;

    #[test]
    fn missing_config_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_config(&tmp.path().join("config.toml")).unwrap().is_none());
    }

    #[test]
    fn load_or_create_writes_file_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let first = load_or_create(&path, || AgentConfig::for_model(ModelId::O3)).unwrap();
        assert!(path.exists());
        let second = load_or_create(&path, || AgentConfig::for_model(ModelId::O1)).unwrap();
        assert_eq!(second.model, ModelId::O3);
        assert_eq!(second.created_at, first.created_at);
    }

    #[test]
    fn save_refreshes_updated_at_and_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut config = AgentConfig::default();
        let before = config.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        save_config(&path, &mut config).unwrap();
        assert!(config.updated_at > before);
        assert!(!tmp.path().join("config.toml.tmp").exists());
    }

    #[test]
    fn out_of_range_values_reported_on_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "temperature = 9.0\n").unwrap();
        let (config, issues) = load_config(&path).unwrap().unwrap();
        assert_eq!(config.temperature, 1.0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "temperature");
    }

    #[test]
    fn unsupported_model_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "model = \"gpt-4o\"\n").unwrap();
        assert!(matches!(load_config(&path), Err(Error::Config(_))));
    }
}
