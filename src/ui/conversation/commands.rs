use std::str::FromStr;

use crate::events::SessionEvent;
use crate::prompts::Persona;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Clear the chat history
    Clear,
    /// Switch persona
    Persona,
    /// Use a custom system prompt
    System,
    Temperature,
    MaxTokens,
    TopP,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

/// What a command asks the UI to do
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Events(Vec<SessionEvent>),
    /// Show a transient notice; nothing changes
    Notice(String),
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Translate into session events, or a notice explaining what went wrong.
    pub fn to_outcome(&self) -> CommandOutcome {
        match self.command {
            SlashCommand::Clear => CommandOutcome::Events(vec![SessionEvent::ClearHistory]),
            SlashCommand::Quit => CommandOutcome::Events(vec![SessionEvent::Quit]),
            SlashCommand::Help => CommandOutcome::Notice(get_help_text()),
            SlashCommand::Persona => match self.argument() {
                None => CommandOutcome::Events(vec![SessionEvent::NextPersona]),
                Some(name) => match name.parse::<Persona>() {
                    Ok(persona) => CommandOutcome::Events(vec![SessionEvent::SelectPersona(persona)]),
                    Err(message) => CommandOutcome::Notice(message),
                },
            },
            SlashCommand::System => {
                let text = self.argument().unwrap_or_default().to_string();
                CommandOutcome::Events(vec![
                    SessionEvent::EditCustomPrompt(text),
                    SessionEvent::SelectPersona(Persona::Custom),
                ])
            }
            SlashCommand::Temperature => self
                .number::<f32>()
                .map(|v| CommandOutcome::Events(vec![SessionEvent::SetTemperature(v)]))
                .unwrap_or_else(|notice| notice),
            SlashCommand::MaxTokens => self
                .number::<u32>()
                .map(|v| CommandOutcome::Events(vec![SessionEvent::SetMaxTokens(v)]))
                .unwrap_or_else(|notice| notice),
            SlashCommand::TopP => self
                .number::<f32>()
                .map(|v| CommandOutcome::Events(vec![SessionEvent::SetTopP(v)]))
                .unwrap_or_else(|notice| notice),
        }
    }

    fn number<T: FromStr>(&self) -> Result<T, CommandOutcome> {
        let raw = self.argument().unwrap_or_default();
        raw.trim().parse::<T>().map_err(|_| {
            CommandOutcome::Notice(format!("/{} expects a number, got '{}'", self.command.command(), raw))
        })
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Clear => "clear the chat history",
            SlashCommand::Persona => "switch persona (friendly, teacher, tech-support, philosopher, custom)",
            SlashCommand::System => "use <text> as a custom system prompt",
            SlashCommand::Temperature => "set temperature (0.0 - 1.5)",
            SlashCommand::MaxTokens => "set max tokens (256 - 4096)",
            SlashCommand::TopP => "set top-p (0.1 - 1.0)",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim_start().strip_prefix('/')?;
    let (head, argument) = match rest.split_once(char::is_whitespace) {
        Some((head, argument)) => (head, argument.trim()),
        None => (rest.trim(), ""),
    };

    let command = SlashCommand::from_str(&head.to_lowercase()).ok().or_else(|| {
        match head.to_lowercase().as_str() {
            "q" | "bye" | "exit" => Some(SlashCommand::Quit),
            "reset" => Some(SlashCommand::Clear),
            "p" => Some(SlashCommand::Persona),
            "temp" => Some(SlashCommand::Temperature),
            "tokens" => Some(SlashCommand::MaxTokens),
            "h" | "?" => Some(SlashCommand::Help),
            _ => None,
        }
    })?;

    let argument = (!argument.is_empty()).then(|| argument.to_string());
    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    SlashCommand::iter()
        .map(|command| format!("/{} - {}", command.command(), command.description()))
        .collect::<Vec<_>>()
        .join("  ·  ")
}
