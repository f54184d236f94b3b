use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Deserialize)]
struct ConfigFile {
    /// LINE channel access token. `LINE_CHANNEL_ACCESS_TOKEN` overrides it.
    #[serde(default)]
    line_channel_access_token: String,
    /// OpenAI API key. `OPENAI_API_KEY` overrides it.
    #[serde(default)]
    openai_api_key: String,
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
    /// Directory for state files (database, logs). Defaults to current directory.
    data_dir: Option<String>,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default)]
    temperature: f32,
    /// Completion calls allowed per user per usage day.
    #[serde(default = "default_daily_call_limit")]
    daily_call_limit: u32,
    /// Log entries replayed to the model as conversation history.
    #[serde(default = "default_history_limit")]
    history_limit: usize,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_max_tokens() -> u32 {
    3000
}

fn default_daily_call_limit() -> u32 {
    6
}

fn default_history_limit() -> usize {
    6
}

#[derive(Debug, Clone)]
pub struct Config {
    pub line_channel_access_token: String,
    pub openai_api_key: String,
    pub listen_addr: String,
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub daily_call_limit: u32,
    pub history_limit: usize,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup (tests pass a closure).
    pub fn load_with_env<P, F>(path: P, env: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let line_channel_access_token = env("LINE_CHANNEL_ACCESS_TOKEN")
            .filter(|v| !v.is_empty())
            .unwrap_or(file.line_channel_access_token);
        let openai_api_key = env("OPENAI_API_KEY")
            .filter(|v| !v.is_empty())
            .unwrap_or(file.openai_api_key);

        if line_channel_access_token.is_empty() {
            return Err(ConfigError::Validation("line_channel_access_token is required".into()));
        }
        if openai_api_key.is_empty() {
            return Err(ConfigError::Validation("openai_api_key is required".into()));
        }
        if !openai_api_key.starts_with("sk-") {
            return Err(ConfigError::Validation(
                "openai_api_key appears invalid (expected format: sk-...)".into(),
            ));
        }
        if file.daily_call_limit == 0 {
            return Err(ConfigError::Validation("daily_call_limit must be at least 1".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            line_channel_access_token,
            openai_api_key,
            listen_addr: file.listen_addr,
            data_dir,
            model: file.model,
            max_tokens: file.max_tokens,
            temperature: file.temperature,
            daily_call_limit: file.daily_call_limit,
            history_limit: file.history_limit,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("eikaiwa.db")
    }
}
