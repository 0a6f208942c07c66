mod config;
mod conversation;
mod error;
mod events;
mod llm;
mod logging;
mod params;
mod prompts;
mod session;
mod streaming;
mod ui;

use clap::{Parser, Subcommand};
use config::Config;
use llm::LlmClient;
use prompts::Persona;
use std::path::PathBuf;
use std::process::ExitCode;
use strum::IntoEnumIterator;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(version)]
#[command(about = "Streaming persona chat with hosted LLMs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Persona to start with (friendly, teacher, tech-support, philosopher, custom)
    #[arg(long)]
    persona: Option<Persona>,

    /// Model identifier, overriding the config file
    #[arg(long)]
    model: Option<String>,

    /// Config file to use instead of ~/.chatbot/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Secrets file consulted before the default locations
    #[arg(long)]
    secrets: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available personas
    Personas,
}

fn list_personas() {
    println!("🎭 Available personas:\n");
    for persona in Persona::iter() {
        let prompt = match persona {
            Persona::Custom => "(your own system prompt, edited in the settings panel)",
            other => other.prompt(),
        };
        println!("  • {:<14} {}", persona.keyword(), persona.display_name());
        println!("    {}", prompt);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Commands::Personas) = cli.command {
        list_personas();
        return ExitCode::SUCCESS;
    }

    // Logging is best effort; the chat works without a log file.
    if let Err(e) = logging::init(&config::chatbot_home()) {
        eprintln!("⚠️ {:#}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "chatbot stopped");
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(persona) = cli.persona {
        config.default_persona = persona;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }

    let mut secrets = Vec::new();
    secrets.extend(cli.secrets);
    secrets.extend(config::default_secrets_locations());

    // No key, no chat: this ends the process before the UI takes the terminal.
    let api_key = config::resolve_api_key(&config.api_key_env, &secrets, |name| std::env::var(name).ok())?;

    info!(provider = %config.provider, model = %config.model, "starting chat");
    let client = LlmClient::new(&config, api_key);
    ui::App::new(&config, client).run().await
}
