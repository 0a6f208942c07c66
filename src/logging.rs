use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `CHATBOT_LOG=debug`.
pub const LOG_FILTER_ENV: &str = "CHATBOT_LOG";

/// Send tracing output to `<dir>/chatbot.log`. The terminal belongs to the
/// UI, so nothing is written to stdout or stderr.
pub fn init(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).context("Failed to create .chatbot directory")?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("chatbot.log"))
        .context("Failed to open log file")?;

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(())
}
