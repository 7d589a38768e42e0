//! Project configuration file support.
//!
//! Loads defaults from `redgreen.toml` in the invocation directory.
//! CLI flags always win over file values.

use anyhow::{Context, Result};
use redgreen_llm::Provider;
use serde::Deserialize;
use std::path::Path;

/// Project-level configuration loaded from `redgreen.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Default provider for every role
    pub provider: Option<String>,
    /// Default model for every role
    pub model: Option<String>,
    /// Tester-specific overrides
    #[serde(default)]
    pub tester: RoleConfig,
    /// Implementer-specific overrides
    #[serde(default)]
    pub implementer: RoleConfig,
    /// Refactorer-specific overrides
    #[serde(default)]
    pub refactorer: RoleConfig,
}

/// Per-role configuration
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Model to use for this role
    pub model: Option<String>,
}

pub const CONFIG_FILE_NAME: &str = "redgreen.toml";

impl ProjectConfig {
    /// Load configuration from a directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if the file exists and parses
    /// - `Ok(None)` if the file does not exist
    /// - `Err(...)` if the file exists but fails to parse (hard error)
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Effective model for a role. Priority: role override > global model.
    pub fn role_model<'a>(&'a self, role: &'a RoleConfig) -> Option<&'a str> {
        role.model.as_deref().or(self.model.as_deref())
    }
}

/// Resolve the API key for a provider.
///
/// Priority: `--api-key` flag > `<PROVIDER>_API_KEY` > `REDGREEN_API_KEY`.
pub fn resolve_api_key(provider: Provider, cli_key: Option<&str>) -> Result<String> {
    if let Some(key) = cli_key {
        return Ok(key.to_string());
    }
    if let Ok(key) = std::env::var(provider.env_key()) {
        if !key.is_empty() {
            return Ok(key);
        }
    }
    if let Ok(key) = std::env::var("REDGREEN_API_KEY") {
        if !key.is_empty() {
            return Ok(key);
        }
    }
    anyhow::bail!(
        "no API key found for {}. Pass --api-key or set {} or REDGREEN_API_KEY",
        provider,
        provider.env_key()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(ProjectConfig::load(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn parses_role_overrides() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"
provider = "openai"
model = "gpt-4.1-mini"

[refactorer]
model = "gpt-4.1"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(tmp.path()).unwrap().unwrap();
        assert_eq!(config.provider.as_deref(), Some("openai"));
        assert_eq!(config.role_model(&config.tester), Some("gpt-4.1-mini"));
        assert_eq!(config.role_model(&config.refactorer), Some("gpt-4.1"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "agent = \"claude\"\n").unwrap();
        assert!(ProjectConfig::load(tmp.path()).is_err());
    }

    #[test]
    fn cli_key_wins() {
        let key = resolve_api_key(Provider::OpenAi, Some("from-flag")).unwrap();
        assert_eq!(key, "from-flag");
    }
}
