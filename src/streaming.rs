//! The per-turn render loop: send the transcript, grow the partial reply
//! fragment by fragment, and store the final text once the stream ends.

use crate::llm::{ChatRequest, CompletionClient, LlmEvent};
use crate::session::ChatSession;
use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Prefix of every reply that stands in for a failed generation.
pub const ERROR_MARKER: &str = "❌ Error:";

/// Visible reply text for a failed generation.
pub fn error_reply(error: impl std::fmt::Display) -> String {
    format!("{} {}", ERROR_MARKER, error)
}

/// Where a turn in progress gets drawn
pub trait TurnRenderer {
    /// Draw the session with `partial` as the in-progress assistant reply.
    /// `None` means the user message was just added and nothing has streamed yet.
    fn render(&mut self, session: &ChatSession, partial: Option<&str>) -> Result<()>;
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed { fragments: usize },
    Failed { message: String },
}

/// State for one streaming reply
#[derive(Debug, Default, Clone)]
pub struct StreamState {
    partial: String,
    fragments: usize,
    failed: Option<String>,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments are ignored; returns whether
    /// anything changed.
    pub fn push_delta(&mut self, delta: &str) -> bool {
        if delta.is_empty() || self.failed.is_some() {
            return false;
        }
        self.partial.push_str(delta);
        self.fragments += 1;
        true
    }

    /// Replace the reply with the visible error text.
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        let message = error.to_string();
        self.partial = error_reply(&message);
        self.failed = Some(message);
    }

    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// Final reply text and how the turn ended
    pub fn finish(self) -> (String, TurnOutcome) {
        let outcome = match self.failed {
            Some(message) => TurnOutcome::Failed { message },
            None => TurnOutcome::Completed { fragments: self.fragments },
        };
        (self.partial, outcome)
    }
}

/// Drives one user turn against a completion client.
pub struct TurnDriver<'a, C> {
    client: &'a C,
    frame_delay: Duration,
}

impl<'a, C: CompletionClient> TurnDriver<'a, C> {
    pub fn new(client: &'a C, frame_delay: Duration) -> Self {
        Self { client, frame_delay }
    }

    /// Stream the reply to an already submitted user message.
    ///
    /// Generation failures become the reply text. Render failures abort the
    /// turn before the assistant message is stored.
    pub async fn stream<R: TurnRenderer>(
        &self,
        session: &mut ChatSession,
        renderer: &mut R,
        request: ChatRequest,
    ) -> Result<TurnOutcome> {
        renderer.render(session, None)?;

        let mut state = StreamState::new();
        match self.client.stream_response(request).await {
            Ok(mut rx) => {
                while let Some(event) = rx.recv().await {
                    match event {
                        LlmEvent::TextDelta(delta) => {
                            if state.push_delta(&delta) {
                                renderer.render(session, Some(state.partial()))?;
                                if !self.frame_delay.is_zero() {
                                    tokio::time::sleep(self.frame_delay).await;
                                }
                            }
                        }
                        LlmEvent::StreamComplete => break,
                        LlmEvent::Error(error) => {
                            state.fail(error);
                            break;
                        }
                    }
                }
            }
            Err(error) => state.fail(error),
        }

        let (reply, outcome) = state.finish();
        match &outcome {
            TurnOutcome::Completed { fragments } => {
                info!(session = %session.id(), fragments, chars = reply.len(), "turn complete")
            }
            TurnOutcome::Failed { message } => {
                warn!(session = %session.id(), %message, "turn failed")
            }
        }
        if let TurnOutcome::Failed { .. } = outcome {
            renderer.render(session, Some(&reply))?;
        }
        session.complete_turn(reply);
        renderer.render(session, None)?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChatError, ChatResult};
    use crate::config::Config;
    use crate::events::{Role, SessionEvent};
    use crate::session::SessionEffect;
    use crate::prompts::Persona;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Replays canned events and records what it was asked
    struct ScriptedClient {
        events: Vec<LlmEvent>,
        reject: Option<u16>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn fragments(fragments: &[&str]) -> Self {
            let mut events: Vec<LlmEvent> =
                fragments.iter().map(|f| LlmEvent::TextDelta(f.to_string())).collect();
            events.push(LlmEvent::StreamComplete);
            Self { events, reject: None, requests: Mutex::new(Vec::new()) }
        }

        fn events(events: Vec<LlmEvent>) -> Self {
            Self { events, reject: None, requests: Mutex::new(Vec::new()) }
        }

        fn rejecting(status: u16) -> Self {
            Self { events: Vec::new(), reject: Some(status), requests: Mutex::new(Vec::new()) }
        }
    }

    impl CompletionClient for ScriptedClient {
        async fn stream_response(&self, request: ChatRequest) -> ChatResult<mpsc::Receiver<LlmEvent>> {
            self.requests.lock().unwrap().push(request);
            if let Some(status) = self.reject {
                return Err(ChatError::Api { status, body: "invalid api key".to_string() });
            }
            let (tx, rx) = mpsc::channel(self.events.len().max(1));
            for event in &self.events {
                tx.send(event.clone()).await.unwrap();
            }
            Ok(rx)
        }
    }

    /// Records every partial it is asked to draw
    #[derive(Default)]
    struct RecordingRenderer {
        frames: Vec<Option<String>>,
        stored_lengths: Vec<usize>,
        fail_after: Option<usize>,
    }

    impl TurnRenderer for RecordingRenderer {
        fn render(&mut self, session: &ChatSession, partial: Option<&str>) -> Result<()> {
            if self.fail_after.is_some_and(|n| self.frames.len() >= n) {
                anyhow::bail!("terminal went away");
            }
            self.frames.push(partial.map(str::to_string));
            self.stored_lengths.push(session.conversation().len());
            Ok(())
        }
    }

    /// Submit `input` the way the app does: through the session reducer.
    async fn turn<C: CompletionClient>(
        client: &C,
        session: &mut ChatSession,
        renderer: &mut RecordingRenderer,
        input: &str,
    ) -> Result<Option<TurnOutcome>> {
        match session.apply(SessionEvent::Submit(input.to_string())) {
            SessionEffect::Send(request) => TurnDriver::new(client, Duration::ZERO)
                .stream(session, renderer, request)
                .await
                .map(Some),
            _ => Ok(None),
        }
    }

    fn session(persona: Persona) -> ChatSession {
        let config = Config { default_persona: persona, ..Config::default() };
        ChatSession::new(&config)
    }

    #[tokio::test]
    async fn teacher_scenario_assembles_the_reply() {
        let client = ScriptedClient::fragments(&["4", " is", " the answer."]);
        let mut session = session(Persona::Teacher);
        let mut renderer = RecordingRenderer::default();

        let outcome = turn(&client, &mut session, &mut renderer, "What is 2+2?")
            .await
            .unwrap();

        assert_eq!(outcome, Some(TurnOutcome::Completed { fragments: 3 }));
        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, Persona::Teacher.prompt());
        assert_eq!(messages[1].content, "What is 2+2?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, "4 is the answer.");

        let partials: Vec<Option<String>> = renderer.frames.clone();
        assert_eq!(
            partials,
            vec![
                None,
                Some("4".to_string()),
                Some("4 is".to_string()),
                Some("4 is the answer.".to_string()),
                None,
            ]
        );
    }

    #[tokio::test]
    async fn reply_is_stored_only_after_the_stream_ends() {
        let client = ScriptedClient::fragments(&["a", "b", "c"]);
        let mut session = session(Persona::FriendlyAssistant);
        let mut renderer = RecordingRenderer::default();

        turn(&client, &mut session, &mut renderer, "hi")
            .await
            .unwrap();

        // system + user while streaming, assistant only on the final frame
        assert_eq!(renderer.stored_lengths, vec![2, 2, 2, 2, 3]);
    }

    #[tokio::test]
    async fn request_contains_the_whole_transcript() {
        let client = ScriptedClient::fragments(&["ok"]);
        let mut session = session(Persona::Philosopher);
        let mut renderer = RecordingRenderer::default();

        turn(&client, &mut session, &mut renderer, "first").await.unwrap();
        turn(&client, &mut session, &mut renderer, "second").await.unwrap();

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(requests[1].messages[0].content, Persona::Philosopher.prompt());
    }

    #[tokio::test]
    async fn n_turns_grow_the_store_by_two_each() {
        let client = ScriptedClient::fragments(&["x", "y"]);
        let mut session = session(Persona::TechSupport);
        let mut renderer = RecordingRenderer::default();

        for n in 1..=4 {
            turn(&client, &mut session, &mut renderer, &format!("turn {}", n)).await.unwrap();
            assert_eq!(session.conversation().len(), 1 + 2 * n);
        }
    }

    #[tokio::test]
    async fn rejected_request_becomes_an_error_reply() {
        let client = ScriptedClient::rejecting(401);
        let mut session = session(Persona::FriendlyAssistant);
        let mut renderer = RecordingRenderer::default();

        let outcome = turn(&client, &mut session, &mut renderer, "hello")
            .await
            .unwrap();

        assert!(matches!(outcome, Some(TurnOutcome::Failed { .. })));
        assert_eq!(session.conversation().len(), 3);
        let reply = session.conversation().last().unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.starts_with(ERROR_MARKER));
        assert!(reply.content.contains("invalid api key"));
    }

    #[tokio::test]
    async fn mid_stream_error_replaces_the_partial_reply() {
        let client = ScriptedClient::events(vec![
            LlmEvent::TextDelta("half an ans".to_string()),
            LlmEvent::Error("Stream error: overloaded".to_string()),
        ]);
        let mut session = session(Persona::FriendlyAssistant);
        let mut renderer = RecordingRenderer::default();

        turn(&client, &mut session, &mut renderer, "hello")
            .await
            .unwrap();

        assert_eq!(session.conversation().len(), 3);
        assert_eq!(
            session.conversation().last().unwrap().content,
            "❌ Error: Stream error: overloaded"
        );
    }

    #[tokio::test]
    async fn channel_closing_early_still_completes_the_turn() {
        let client = ScriptedClient::events(vec![LlmEvent::TextDelta("cut".to_string())]);
        let mut session = session(Persona::FriendlyAssistant);
        let mut renderer = RecordingRenderer::default();

        let outcome = turn(&client, &mut session, &mut renderer, "hello")
            .await
            .unwrap();

        assert_eq!(outcome, Some(TurnOutcome::Completed { fragments: 1 }));
        assert_eq!(session.conversation().last().unwrap().content, "cut");
    }

    #[tokio::test]
    async fn render_failure_mid_stream_stores_no_partial_reply() {
        let client = ScriptedClient::fragments(&["a", "b", "c"]);
        let mut session = session(Persona::FriendlyAssistant);
        let mut renderer = RecordingRenderer { fail_after: Some(2), ..Default::default() };

        let result = turn(&client, &mut session, &mut renderer, "hello")
            .await;

        assert!(result.is_err());
        assert_eq!(session.conversation().len(), 2);
        assert_eq!(session.conversation().last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn blank_input_sends_nothing() {
        let client = ScriptedClient::fragments(&["unused"]);
        let mut session = session(Persona::FriendlyAssistant);
        let mut renderer = RecordingRenderer::default();

        let outcome = turn(&client, &mut session, &mut renderer, "   ")
            .await
            .unwrap();

        assert_eq!(outcome, None);
        assert!(client.requests.lock().unwrap().is_empty());
        assert_eq!(session.conversation().len(), 1);
    }

    #[test]
    fn stream_state_skips_empty_fragments() {
        let mut state = StreamState::new();
        assert!(state.push_delta("a"));
        assert!(!state.push_delta(""));
        assert!(state.push_delta("b"));
        let (reply, outcome) = state.finish();
        assert_eq!(reply, "ab");
        assert_eq!(outcome, TurnOutcome::Completed { fragments: 2 });
    }
}
