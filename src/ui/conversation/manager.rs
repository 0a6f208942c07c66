use crate::events::{SessionEvent, TuiEvent};
use crate::session::ChatSession;
use crate::ui::conversation::commands::CommandOutcome;
use crate::ui::conversation::composer::ComposerResult;
use crate::ui::conversation::settings::{Focus, SettingsPanel};
use crate::ui::conversation::{ConversationComposer, ConversationHistory};
use crossterm::event::{KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Lays out the chat screen and turns terminal input into session events
pub struct ConversationView {
    composer: ConversationComposer,
    settings: SettingsPanel,
    focus: Focus,
    notice: Option<String>,
    provider: String,
    model: String,
}

impl ConversationView {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            composer: ConversationComposer::new("Type your message…"),
            settings: SettingsPanel::new(),
            focus: Focus::Chat,
            notice: None,
            provider: provider.into(),
            model: model.into(),
        }
    }

    #[cfg(test)]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Map one terminal event to the session events it triggers
    pub fn handle_event(&mut self, event: TuiEvent, session: &ChatSession) -> Vec<SessionEvent> {
        match event {
            TuiEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    return Vec::new();
                }
                self.notice = None;

                if key.code == KeyCode::Esc
                    || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
                {
                    return vec![SessionEvent::Quit];
                }

                match key.code {
                    KeyCode::Tab => {
                        self.set_focus(self.focus.next(session.persona()));
                        return Vec::new();
                    }
                    KeyCode::BackTab => {
                        self.set_focus(self.focus.previous(session.persona()));
                        return Vec::new();
                    }
                    _ => {}
                }

                if self.focus != Focus::Chat {
                    return self.settings.handle_key(self.focus, key).into_iter().collect();
                }

                match self.composer.handle_key(key) {
                    ComposerResult::Submitted(text) => vec![SessionEvent::Submit(text)],
                    ComposerResult::Command(command) => match command.to_outcome() {
                        CommandOutcome::Events(events) => events,
                        CommandOutcome::Notice(notice) => {
                            self.notice = Some(notice);
                            Vec::new()
                        }
                    },
                    ComposerResult::Edited | ComposerResult::None => Vec::new(),
                }
            }
            TuiEvent::Paste(text) => match self.focus {
                Focus::Chat => {
                    self.composer.paste(&text);
                    Vec::new()
                }
                Focus::CustomPrompt => vec![self.settings.paste(&text)],
                _ => Vec::new(),
            },
            TuiEvent::Resize => Vec::new(),
        }
    }

    /// Re-align view state after the session changed
    pub fn after_apply(&mut self, session: &ChatSession) {
        self.settings.sync_from(session);
        if self.focus == Focus::CustomPrompt && session.persona() != crate::prompts::Persona::Custom {
            self.set_focus(Focus::Persona);
        }
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.composer.set_focus(focus == Focus::Chat);
    }

    /// Draw the whole screen. `partial` is the assistant reply being streamed.
    pub fn draw(&self, frame: &mut Frame, session: &ChatSession, partial: Option<&str>) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(36), Constraint::Min(40)])
            .split(frame.size());

        self.settings.draw(frame, columns[0], session, self.focus);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Caption
                Constraint::Min(5),    // History
                Constraint::Length(1), // Notice / status
                Constraint::Length(3), // Composer
            ])
            .split(columns[1]);

        let caption = Line::from(vec![
            Span::raw("Provider: "),
            Span::styled(self.provider.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" · Model: "),
            Span::styled(self.model.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" · Streaming enabled"),
        ]);
        frame.render_widget(Paragraph::new(caption), rows[0]);

        let history = ConversationHistory::new(session.conversation().visible())
            .with_streaming_message(partial);
        frame.render_widget(history, rows[1]);

        let status = match (&self.notice, partial) {
            (Some(notice), _) => Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Yellow))),
            (None, Some(_)) => Line::from(Span::styled("🤖 Bot is typing…", Style::default().fg(Color::Green))),
            (None, None) => Line::default(),
        };
        frame.render_widget(Paragraph::new(status), rows[2]);

        frame.render_widget(&self.composer, rows[3]);
    }
}
