use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the program before the chat UI is shown.
#[derive(Debug, Error)]
pub enum StartupError {
    /// No API key in any secrets file nor in the environment.
    #[error("No {env_var} found. Please set it in .env (local) or secrets.toml.")]
    MissingApiKey { env_var: String },

    /// The config file exists but could not be read or parsed.
    #[error("Failed to load config from {path}: {message}")]
    Config { path: PathBuf, message: String },
}

/// Errors raised while generating a reply. Never fatal: the turn driver turns
/// them into a visible error string.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport failure (connect, TLS, body read).
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider reported an error inside the event stream.
    #[error("Stream error: {0}")]
    Stream(String),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
