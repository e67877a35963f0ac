//! API key resolution and storage.
//!
//! Resolution order:
//! 1. `OPENAI_API_KEY` environment variable
//! 2. The agent's `secrets.json` (model-specific key, then `default`)
//! 3. OS keychain (`unified-agent` / `openai-api-key`)
//!
//! Interactive prompting is left to the caller; [`save_api_key`] persists
//! whatever it collected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use ua_domain::error::{Error, Result};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const KEYCHAIN_SERVICE: &str = "unified-agent";
pub const KEYCHAIN_ACCOUNT: &str = "openai-api-key";

const MIN_KEY_LEN: usize = 40;

/// On-disk shape of `secrets.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsFile {
    #[serde(default = "d_provider")]
    pub provider: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// `default` plus optional per-model keys.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
}

fn d_provider() -> String {
    "openai".into()
}

impl Default for SecretsFile {
    fn default() -> Self {
        Self {
            provider: d_provider(),
            created_at: Utc::now(),
            keys: BTreeMap::new(),
        }
    }
}

/// Where a resolved key came from, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Env,
    SecretsFile,
    Keychain,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeySource::Env => API_KEY_ENV,
            KeySource::SecretsFile => "secrets.json",
            KeySource::Keychain => "OS keychain",
        })
    }
}

/// Resolve a key without prompting. `None` means the caller must ask.
pub fn resolve_api_key(secrets_path: &Path, model: &str) -> Option<(String, KeySource)> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            return Some((key.trim().to_string(), KeySource::Env));
        }
    }

    match key_from_secrets_file(secrets_path, model) {
        Ok(Some(key)) => return Some((key, KeySource::SecretsFile)),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(path = %secrets_path.display(), error = %e, "could not read secrets file");
        }
    }

    match resolve_from_keychain(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT) {
        Ok(key) => Some((key, KeySource::Keychain)),
        Err(e) => {
            tracing::debug!(error = %e, "keychain lookup failed");
            None
        }
    }
}

/// Read the model-specific key, falling back to `default`.
pub fn key_from_secrets_file(path: &Path, model: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let secrets: SecretsFile = serde_json::from_str(&raw)?;
    Ok(secrets
        .keys
        .get(model)
        .or_else(|| secrets.keys.get("default"))
        .filter(|k| !k.is_empty())
        .cloned())
}

/// Try to read a secret from the OS keychain.
///
/// Returns an error on headless systems where no keychain daemon is available.
pub fn resolve_from_keychain(service: &str, account: &str) -> Result<String> {
    let entry = keyring::Entry::new(service, account)
        .map_err(|e| Error::Credential(format!("keyring entry creation failed: {e}")))?;
    entry
        .get_password()
        .map_err(|e| Error::Credential(format!("keyring get_password failed: {e}")))
}

/// Reject keys that cannot be OpenAI secret keys.
pub fn validate_api_key(key: &str) -> Result<()> {
    if !key.starts_with("sk-") {
        return Err(Error::Credential("API key must start with 'sk-'".into()));
    }
    if key.len() < MIN_KEY_LEN {
        return Err(Error::Credential(format!(
            "API key too short (expected at least {MIN_KEY_LEN} characters)"
        )));
    }
    Ok(())
}

/// `sk-abcde...wxyz` style rendering for logs and banners.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Store `key` under `default` (and under `model`, if given) in
/// `secrets.json`, keeping any other keys already there.
///
/// The file is written with mode `0o600` on Unix and replaced atomically.
pub fn save_api_key(path: &Path, key: &str, model: Option<&str>) -> Result<()> {
    validate_api_key(key)?;

    let mut secrets = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "replacing unreadable secrets file");
            SecretsFile::default()
        })
    } else {
        SecretsFile::default()
    };
    secrets.keys.insert("default".into(), key.to_string());
    if let Some(model) = model {
        secrets.keys.insert(model.to_string(), key.to_string());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&secrets)?;
    let tmp = path.with_extension("json.tmp");

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(&tmp, json.as_bytes())?;
    }

    std::fs::rename(&tmp, path)?;
    tracing::info!(path = %path.display(), key = %mask_api_key(key), "API key saved");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "sk-test0123456789abcdefghijklmnopqrstuvwxyz";

    #[test]
    fn validate_rejects_bad_keys() {
        assert!(validate_api_key(KEY).is_ok());
        assert!(validate_api_key("pk-0123456789abcdefghijklmnopqrstuvwxyz0123").is_err());
        assert!(validate_api_key("sk-short").is_err());
    }

    #[test]
    fn mask_keeps_head_and_tail() {
        assert_eq!(mask_api_key(KEY), "sk-test0...wxyz");
        assert_eq!(mask_api_key("short"), "*****");
    }

    #[test]
    fn save_then_read_prefers_model_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");

        save_api_key(&path, KEY, None).unwrap();
        let other = "sk-model9876543210zyxwvutsrqponmlkjihgfedcba";
        save_api_key(&path, other, Some("o3")).unwrap();

        assert_eq!(key_from_secrets_file(&path, "o3").unwrap().as_deref(), Some(other));
        // `default` was overwritten by the second save.
        assert_eq!(key_from_secrets_file(&path, "o1").unwrap().as_deref(), Some(other));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        assert!(key_from_secrets_file(&path, "o1").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        save_api_key(&path, KEY, None).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn invalid_key_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        assert!(save_api_key(&path, "nope", None).is_err());
        assert!(!path.exists());
    }
}
