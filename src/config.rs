use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Proxy server settings
    pub server: ServerConfig,

    /// Completion provider settings
    pub provider: ProviderConfig,

    /// Terminal client settings
    pub client: ClientConfig,

    /// `tracing` filter used when `RUST_LOG` is not set
    pub log_level: String,

    /// Sparkchat home directory
    #[serde(skip)]
    pub sparkchat_home: PathBuf,
}

/// Proxy server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
}

/// Terminal client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the proxy server the client talks to
    pub server_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            client: ClientConfig::default(),
            log_level: "info".to_string(),
            sparkchat_home: home.join(".sparkchat"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.sparkchat/config.toml`, then apply environment overrides
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let sparkchat_home = home.join(".sparkchat");

        fs::create_dir_all(&sparkchat_home)
            .context("Failed to create .sparkchat directory")?;

        let mut config = Self::load_from(&sparkchat_home.join("config.toml"))?;
        config.sparkchat_home = sparkchat_home;
        config.apply_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Read a config file, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .context("Failed to read config file")?;
        toml::from_str(&content)
            .context("Failed to parse config file")
    }

    /// Override file values with `SPARKCHAT_*` variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("SPARKCHAT_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(url) = lookup("SPARKCHAT_SERVER_URL") {
            self.client.server_url = url;
        }
        if let Some(url) = lookup("SPARKCHAT_PROVIDER_URL") {
            self.provider.base_url = url;
        }
        if let Some(model) = lookup("SPARKCHAT_MODEL") {
            self.provider.model = model;
        }
        if let Some(level) = lookup("SPARKCHAT_LOG") {
            self.log_level = level;
        }
        if let Some(key) = lookup(&self.provider.api_key_env) {
            if !key.trim().is_empty() {
                self.provider.api_key = Some(key);
            }
        }
    }

    pub fn profile_path(&self) -> PathBuf {
        self.sparkchat_home.join("profile.toml")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.sparkchat_home.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.provider.model, "llama-3.3-70b-versatile");
        assert_eq!(config.provider.api_key_env, "GROQ_API_KEY");
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nbind_address = \"0.0.0.0:8080\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.client.server_url, "http://127.0.0.1:3000");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("SPARKCHAT_BIND", "0.0.0.0:9000"),
            ("SPARKCHAT_MODEL", "other-model"),
            ("GROQ_API_KEY", "gsk-test"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.provider.model, "other-model");
        assert_eq!(config.provider.api_key.as_deref(), Some("gsk-test"));
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let mut config = Config::default();
        config.apply_env(|key| (key == "GROQ_API_KEY").then(|| "  ".to_string()));
        assert!(config.provider.api_key.is_none());
    }
}
