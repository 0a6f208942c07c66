use crate::error::StartupError;
use crate::params::GenerationParameters;
use crate::prompts::Persona;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider display name, shown in the header
    pub provider: String,

    /// Model identifier sent with every request
    pub model: String,

    /// OpenAI-compatible API root, without `/chat/completions`
    pub base_url: String,

    /// Name of the secret / environment variable holding the API key
    pub api_key_env: String,

    /// Persona selected at startup
    pub default_persona: Persona,

    /// Initial slider positions
    pub defaults: GenerationParameters,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Pause after each streamed fragment is drawn
    pub frame_delay_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { frame_delay_ms: 10 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: "Groq".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            default_persona: Persona::default(),
            defaults: GenerationParameters::default(),
            ui: UiConfig::default(),
        }
    }
}

/// `~/.chatbot`, falling back to `./.chatbot` when there is no home directory.
pub fn chatbot_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".chatbot"))
        .unwrap_or_else(|| PathBuf::from(".chatbot"))
}

impl Config {
    /// Load `~/.chatbot/config.toml`, or defaults when it does not exist.
    pub fn load() -> Result<Self, StartupError> {
        Self::load_from(&chatbot_home().join("config.toml"))
    }

    /// Load a config file. A missing file yields defaults; an unreadable or
    /// malformed one is a startup error.
    pub fn load_from(path: &Path) -> Result<Self, StartupError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| StartupError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| StartupError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.defaults = self.defaults.clamped();
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }

    /// Endpoint for streaming chat completions
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Secrets files consulted before the environment, most specific first.
pub fn default_secrets_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        locations.push(cwd.join(".chatbot").join("secrets.toml"));
    }
    locations.push(chatbot_home().join("secrets.toml"));
    locations
}

/// Resolve the API key: secrets files first, then the environment.
///
/// Secrets files that cannot be read or parsed are skipped. `env` is the
/// environment lookup, `std::env::var(..).ok()` outside of tests.
pub fn resolve_api_key<F>(
    key_name: &str,
    secrets_locations: &[PathBuf],
    env: F,
) -> Result<String, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    for path in secrets_locations {
        if let Some(key) = read_secret(path, key_name) {
            debug!(path = %path.display(), "API key resolved from secrets file");
            return Ok(key);
        }
    }

    if let Some(key) = env(key_name).filter(|k| !k.trim().is_empty()) {
        debug!(var = key_name, "API key resolved from environment");
        return Ok(key);
    }

    Err(StartupError::MissingApiKey { env_var: key_name.to_string() })
}

fn read_secret(path: &Path, key_name: &str) -> Option<String> {
    if !path.exists() {
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable secrets file");
            return None;
        }
    };

    let table: toml::Table = match toml::from_str(&content) {
        Ok(table) => table,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping malformed secrets file");
            return None;
        }
    };

    table
        .get(key_name)
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}
