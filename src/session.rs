use crate::config::Config;
use crate::conversation::{Conversation, Message};
use crate::events::SessionEvent;
use crate::llm::ChatRequest;
use crate::params::GenerationParameters;
use crate::prompts::Persona;
use tracing::{debug, info};
use uuid::Uuid;

/// What the caller has to do after an event was applied
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Redraw only
    None,
    /// A user message was added; stream a reply for this request
    Send(ChatRequest),
    Quit,
}

/// Everything one chat session owns: transcript, sliders and persona.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    conversation: Conversation,
    params: GenerationParameters,
    persona: Persona,
    custom_prompt: String,
}

impl ChatSession {
    pub fn new(config: &Config) -> Self {
        let persona = config.default_persona;
        let session = Self {
            id: Uuid::new_v4(),
            conversation: Conversation::new(persona.prompt()),
            params: config.defaults.clamped(),
            persona,
            custom_prompt: String::new(),
        };
        info!(session = %session.id, persona = persona.keyword(), "session started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn params(&self) -> GenerationParameters {
        self.params
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn custom_prompt(&self) -> &str {
        &self.custom_prompt
    }

    /// System prompt the transcript must carry right now
    pub fn active_prompt(&self) -> &str {
        match self.persona {
            Persona::Custom => self.custom_prompt.as_str(),
            persona => persona.prompt(),
        }
    }

    /// Apply one user action, then bring the system message in line with the
    /// selected persona.
    pub fn apply(&mut self, event: SessionEvent) -> SessionEffect {
        let effect = match event {
            SessionEvent::Submit(text) => match self.submit(&text) {
                Some(request) => SessionEffect::Send(request),
                None => SessionEffect::None,
            },
            SessionEvent::ClearHistory => {
                let prompt = self.active_prompt().to_string();
                self.conversation.reset(prompt);
                info!(session = %self.id, "history cleared");
                SessionEffect::None
            }
            SessionEvent::SelectPersona(persona) => {
                self.select_persona(persona);
                SessionEffect::None
            }
            SessionEvent::NextPersona => {
                self.select_persona(self.persona.next());
                SessionEffect::None
            }
            SessionEvent::PreviousPersona => {
                self.select_persona(self.persona.previous());
                SessionEffect::None
            }
            SessionEvent::EditCustomPrompt(text) => {
                self.custom_prompt = text;
                SessionEffect::None
            }
            SessionEvent::SetTemperature(value) => {
                self.params.set_temperature(value);
                SessionEffect::None
            }
            SessionEvent::SetMaxTokens(value) => {
                self.params.set_max_tokens(value);
                SessionEffect::None
            }
            SessionEvent::SetTopP(value) => {
                self.params.set_top_p(value);
                SessionEffect::None
            }
            SessionEvent::StepTemperature(steps) => {
                self.params.step_temperature(steps);
                SessionEffect::None
            }
            SessionEvent::StepMaxTokens(steps) => {
                self.params.step_max_tokens(steps);
                SessionEffect::None
            }
            SessionEvent::StepTopP(steps) => {
                self.params.step_top_p(steps);
                SessionEffect::None
            }
            SessionEvent::Quit => SessionEffect::Quit,
        };

        self.sync_system_prompt();
        effect
    }

    /// Append a user message and build the request for it. Blank input is
    /// ignored.
    pub fn submit(&mut self, text: &str) -> Option<ChatRequest> {
        if text.trim().is_empty() {
            return None;
        }
        self.sync_system_prompt();
        self.conversation.append(Message::user(text));
        debug!(session = %self.id, messages = self.conversation.len(), "user message added");
        Some(ChatRequest::new(self.conversation.messages().to_vec(), self.params))
    }

    /// Store the finished reply of the current turn.
    pub fn complete_turn(&mut self, reply: String) {
        self.conversation.append(Message::assistant(reply));
    }

    fn select_persona(&mut self, persona: Persona) {
        if persona != self.persona {
            debug!(session = %self.id, persona = persona.keyword(), "persona changed");
        }
        self.persona = persona;
    }

    fn sync_system_prompt(&mut self) {
        let prompt = self.active_prompt().to_string();
        self.conversation.sync_system_prompt(&prompt);
    }
}
