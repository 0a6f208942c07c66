use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};

/// Preset personas that shape the assistant through the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Persona {
    #[default]
    FriendlyAssistant,
    Teacher,
    TechSupport,
    Philosopher,
    /// Free-text persona edited in the settings panel.
    Custom,
}

impl Persona {
    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::FriendlyAssistant => "🤝 Friendly Assistant",
            Persona::Teacher => "👨‍🏫 Teacher",
            Persona::TechSupport => "🛠 Tech Support",
            Persona::Philosopher => "🧘 Philosopher",
            Persona::Custom => "✍️ Custom",
        }
    }

    /// Short identifier accepted by `--persona` and `/persona`.
    pub fn keyword(&self) -> &'static str {
        match self {
            Persona::FriendlyAssistant => "friendly",
            Persona::Teacher => "teacher",
            Persona::TechSupport => "tech-support",
            Persona::Philosopher => "philosopher",
            Persona::Custom => "custom",
        }
    }

    /// Canonical system prompt. Empty for `Custom`, whose text lives in the session.
    pub fn prompt(&self) -> &'static str {
        match self {
            Persona::FriendlyAssistant => FRIENDLY_PROMPT,
            Persona::Teacher => TEACHER_PROMPT,
            Persona::TechSupport => TECH_SUPPORT_PROMPT,
            Persona::Philosopher => PHILOSOPHER_PROMPT,
            Persona::Custom => "",
        }
    }

    pub fn next(&self) -> Persona {
        let all: Vec<Persona> = Persona::iter().collect();
        let index = all.iter().position(|p| p == self).unwrap_or(0);
        all[(index + 1) % all.len()]
    }

    pub fn previous(&self) -> Persona {
        let all: Vec<Persona> = Persona::iter().collect();
        let index = all.iter().position(|p| p == self).unwrap_or(0);
        all[(index + all.len() - 1) % all.len()]
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "friendly" | "friendly-assistant" | "assistant" => Ok(Persona::FriendlyAssistant),
            "teacher" => Ok(Persona::Teacher),
            "tech-support" | "techsupport" | "support" => Ok(Persona::TechSupport),
            "philosopher" => Ok(Persona::Philosopher),
            "custom" => Ok(Persona::Custom),
            other => Err(format!(
                "unknown persona '{}' (expected one of: {})",
                other,
                Persona::iter().map(|p| p.keyword()).collect::<Vec<_>>().join(", ")
            )),
        }
    }
}

const FRIENDLY_PROMPT: &str =
    "You are a helpful and friendly assistant. Keep answers simple and warm.";

const TEACHER_PROMPT: &str =
    "You are a teacher who explains concepts clearly with step-by-step examples.";

const TECH_SUPPORT_PROMPT: &str =
    "You are a tech support agent. Ask clarifying questions and give solutions.";

const PHILOSOPHER_PROMPT: &str =
    "You are a deep thinker. Provide thoughtful, reflective answers.";
