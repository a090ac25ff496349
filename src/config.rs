use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub gemini: GeminiConfig,
    #[serde(default = "default_server_config")]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Public URL registered with Telegram at startup, e.g.
    /// "https://example.com/api/webhook". Left unset when the webhook is
    /// managed out of band.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound for a single generateContent call. Required.
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_model() -> String {
    "gemini-pro".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind_address: default_bind_address(),
    }
}

impl Config {
    /// Read the TOML file, apply secret overrides from the process
    /// environment and validate the result.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Secrets set in the environment win over the file. Empty values are
    /// treated as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TELEGRAM_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(key) = lookup(GEMINI_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.gemini.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!(
                "Missing Telegram bot token: set [telegram] bot_token or {}",
                TELEGRAM_TOKEN_ENV
            );
        }
        if self.gemini.api_key.trim().is_empty() {
            anyhow::bail!(
                "Missing Gemini API key: set [gemini] api_key or {}",
                GEMINI_KEY_ENV
            );
        }
        if self.gemini.timeout_secs == 0 {
            anyhow::bail!("[gemini] timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[gemini]
timeout_secs = 30
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(
            config.gemini.base_url,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(config.gemini.timeout(), Duration::from_secs(30));
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert!(config.telegram.webhook_url.is_none());
    }

    #[test]
    fn test_timeout_is_required() {
        let err = Config::from_toml_str("[gemini]\nmodel = \"gemini-pro\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("timeout_secs"));
    }

    #[test]
    fn test_missing_secrets_rejected() {
        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        config.apply_env_overrides(no_env);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(TELEGRAM_TOKEN_ENV));

        config.telegram.bot_token = "123:abc".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(GEMINI_KEY_ENV));
    }

    #[test]
    fn test_env_overrides_file_secrets() {
        let toml = r#"
[telegram]
bot_token = "from-file"

[gemini]
api_key = "file-key"
timeout_secs = 10
"#;
        let mut config = Config::from_toml_str(toml).unwrap();
        config.apply_env_overrides(|key| match key {
            TELEGRAM_TOKEN_ENV => Some("from-env".to_string()),
            GEMINI_KEY_ENV => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.gemini.api_key, "file-key");
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let toml = r#"
[telegram]
bot_token = "t"

[gemini]
api_key = "k"
timeout_secs = 0
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert!(config.validate().is_err());
    }
}
