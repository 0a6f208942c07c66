use crate::prompts::Persona;
use serde::{Deserialize, Serialize};

/// Role of a message in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User actions applied to a chat session. Each one is followed by a redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Send a chat message
    Submit(String),

    /// Drop the transcript, keeping only the system prompt
    ClearHistory,

    SelectPersona(Persona),
    NextPersona,
    PreviousPersona,

    /// Replace the custom persona's text
    EditCustomPrompt(String),

    SetTemperature(f32),
    SetMaxTokens(u32),
    SetTopP(f32),

    /// Move a slider by whole steps (negative moves down)
    StepTemperature(i32),
    StepMaxTokens(i32),
    StepTopP(i32),

    Quit,
}

/// TUI-specific events (keyboard, resize)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    Key(crossterm::event::KeyEvent),
    Paste(String),
    Resize,
}
