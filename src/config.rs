//! Configuration loader and validator for the console client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable that overrides `api.token`.
pub const TOKEN_ENV: &str = "TECMETRICS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub api: Api,
    #[serde(default)]
    pub app: App,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    /// Session token attached as a bearer credential.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// List defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub default_limit: u32,
    /// Page size used when a form needs every record of a resource as options.
    pub lookup_limit: u32,
}

impl Default for App {
    fn default() -> Self {
        Self {
            default_limit: 10,
            lookup_limit: 1000,
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("tecmetrics-console/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Token to send, ignoring blank values.
    pub fn token(&self) -> Option<&str> {
        self.api.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - `TECMETRICS_TOKEN` replaces `api.token` when set.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env(|key| std::env::var(key).ok());
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    match Url::parse(cfg.api.base_url.trim()) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => return Err(ConfigError::Invalid("api.base_url must be an http(s) URL")),
    }
    if cfg.api.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("api.timeout_seconds must be > 0"));
    }
    if cfg.api.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("api.user_agent must be non-empty"));
    }
    if cfg.app.default_limit == 0 {
        return Err(ConfigError::Invalid("app.default_limit must be > 0"));
    }
    if cfg.app.lookup_limit == 0 {
        return Err(ConfigError::Invalid("app.lookup_limit must be > 0"));
    }
    Ok(())
}

/// Reference configuration document.
pub fn example() -> &'static str {
    r#"api:
  base_url: "https://api.tecmetrics.example/api/v1/"
  token: "YOUR_SESSION_TOKEN"
  timeout_seconds: 30
  user_agent: "tecmetrics-console/0.1"

app:
  default_limit: 10
  lookup_limit: 1000
"#
}
