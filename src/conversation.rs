//! Ordered, role-tagged transcript of one chat session.

use crate::events::Role;
use serde::{Deserialize, Serialize};

/// Message in conversation, in the provider's wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Conversation store.
///
/// Index 0 is always the single system message. Everything after it is
/// user/assistant turns in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { messages: vec![Message::system(system_prompt)] }
    }

    /// Add a user or assistant message at the end.
    ///
    /// A system message would break the index-0 invariant, so its content is
    /// routed to [`Conversation::sync_system_prompt`] instead.
    pub fn append(&mut self, message: Message) {
        if message.role == Role::System {
            self.sync_system_prompt(&message.content);
            return;
        }
        self.messages.push(message);
    }

    /// Replace the whole transcript with a single system message.
    pub fn reset(&mut self, system_prompt: impl Into<String>) {
        self.messages.clear();
        self.messages.push(Message::system(system_prompt));
    }

    /// Overwrite the system message in place when it differs from `prompt`.
    /// Returns whether anything changed.
    pub fn sync_system_prompt(&mut self, prompt: &str) -> bool {
        match self.messages.first_mut() {
            Some(first) if first.role == Role::System => {
                if first.content == prompt {
                    return false;
                }
                first.content = prompt.to_string();
                true
            }
            _ => {
                self.messages.insert(0, Message::system(prompt));
                true
            }
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.messages.first().map(|m| m.content.as_str()).unwrap_or_default()
    }

    /// Full transcript, system message included. This is what gets sent.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages shown in the transcript view.
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
