//! Settings side panel: persona, sampling sliders, custom prompt, clear button.

use crate::events::SessionEvent;
use crate::params::{MAX_TOKENS, SliderSpec, TEMPERATURE, TOP_P};
use crate::prompts::Persona;
use crate::session::ChatSession;
use crate::ui::conversation::composer::TextInput;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

/// Control that receives key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Chat,
    Persona,
    Temperature,
    MaxTokens,
    TopP,
    CustomPrompt,
    ClearButton,
}

const FOCUS_ORDER: [Focus; 7] = [
    Focus::Chat,
    Focus::Persona,
    Focus::Temperature,
    Focus::MaxTokens,
    Focus::TopP,
    Focus::CustomPrompt,
    Focus::ClearButton,
];

impl Focus {
    /// The custom prompt box only exists while the Custom persona is selected.
    fn is_available(self, persona: Persona) -> bool {
        self != Focus::CustomPrompt || persona == Persona::Custom
    }

    fn cycle(self, persona: Persona, forward: bool) -> Focus {
        let len = FOCUS_ORDER.len();
        let mut index = FOCUS_ORDER.iter().position(|f| *f == self).unwrap_or(0);
        loop {
            index = if forward { (index + 1) % len } else { (index + len - 1) % len };
            let candidate = FOCUS_ORDER[index];
            if candidate.is_available(persona) {
                return candidate;
            }
        }
    }

    pub fn next(self, persona: Persona) -> Focus {
        self.cycle(persona, true)
    }

    pub fn previous(self, persona: Persona) -> Focus {
        self.cycle(persona, false)
    }
}

/// Side panel state; the values themselves live in the session
#[derive(Debug, Clone, Default)]
pub struct SettingsPanel {
    custom_prompt: TextInput,
}

impl SettingsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the edit buffer in line with the session, e.g. after `/system`.
    pub fn sync_from(&mut self, session: &ChatSession) {
        if self.custom_prompt.content() != session.custom_prompt() {
            self.custom_prompt.set(session.custom_prompt());
        }
    }

    /// Turn a key press on the focused control into a session event.
    pub fn handle_key(&mut self, focus: Focus, key: KeyEvent) -> Option<SessionEvent> {
        let steps = match key.code {
            KeyCode::Right | KeyCode::Up => 1,
            KeyCode::Left | KeyCode::Down => -1,
            KeyCode::PageUp => 5,
            KeyCode::PageDown => -5,
            _ => 0,
        };

        match focus {
            Focus::Chat => None,
            Focus::Persona => match steps {
                s if s > 0 => Some(SessionEvent::NextPersona),
                s if s < 0 => Some(SessionEvent::PreviousPersona),
                _ => None,
            },
            Focus::Temperature => (steps != 0).then_some(SessionEvent::StepTemperature(steps)),
            Focus::MaxTokens => (steps != 0).then_some(SessionEvent::StepMaxTokens(steps)),
            Focus::TopP => (steps != 0).then_some(SessionEvent::StepTopP(steps)),
            Focus::ClearButton => {
                matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')).then_some(SessionEvent::ClearHistory)
            }
            Focus::CustomPrompt => {
                let changed = match key.code {
                    KeyCode::Enter => {
                        self.custom_prompt.insert_char('\n');
                        true
                    }
                    _ => self.custom_prompt.handle_edit_key(key),
                };
                changed.then(|| SessionEvent::EditCustomPrompt(self.custom_prompt.content().to_string()))
            }
        }
    }

    pub fn paste(&mut self, text: &str) -> SessionEvent {
        self.custom_prompt.insert_str(text);
        SessionEvent::EditCustomPrompt(self.custom_prompt.content().to_string())
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, session: &ChatSession, focus: Focus) {
        let outer = Block::default().borders(Borders::ALL).title("⚙️ Chatbot Settings");
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let persona = session.persona();
        let custom_height = if persona == Persona::Custom { 7 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(custom_height),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(inner);

        let persona_line = Line::from(vec![
            Span::styled("◀ ", Style::default().fg(Color::DarkGray)),
            Span::raw(persona.display_name()),
            Span::styled(" ▶", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(
            Paragraph::new(persona_line).block(control_block("🎭 Bot Persona", focus == Focus::Persona)),
            chunks[0],
        );

        let params = session.params();
        draw_slider(frame, chunks[1], &TEMPERATURE, params.temperature, format!("{:.2}", params.temperature), focus == Focus::Temperature);
        draw_slider(frame, chunks[2], &MAX_TOKENS, params.max_tokens as f32, params.max_tokens.to_string(), focus == Focus::MaxTokens);
        draw_slider(frame, chunks[3], &TOP_P, params.top_p, format!("{:.2}", params.top_p), focus == Focus::TopP);

        if persona == Persona::Custom {
            let focused = focus == Focus::CustomPrompt;
            let text = if focused {
                self.custom_prompt.with_cursor_marker()
            } else {
                self.custom_prompt.content().to_string()
            };
            frame.render_widget(
                Paragraph::new(text)
                    .wrap(Wrap { trim: false })
                    .block(control_block("✍️ Custom system prompt", focused)),
                chunks[4],
            );
        }

        let clear_style = if focus == Focus::ClearButton {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled("🧹 Clear chat history", clear_style)))
                .block(control_block("", focus == Focus::ClearButton)),
            chunks[5],
        );

        let hints = vec![
            Line::from(Span::styled("Tab/Shift+Tab  move focus", Style::default().fg(Color::DarkGray))),
            Line::from(Span::styled("←/→  adjust setting", Style::default().fg(Color::DarkGray))),
            Line::from(Span::styled("Esc/Ctrl+C  quit", Style::default().fg(Color::DarkGray))),
        ];
        frame.render_widget(Paragraph::new(hints), chunks[6]);
    }
}

fn control_block(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(if focused {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        })
}

fn draw_slider(frame: &mut Frame, area: Rect, spec: &SliderSpec, value: f32, label: String, focused: bool) {
    let gauge = Gauge::default()
        .block(control_block(spec.label, focused))
        .gauge_style(Style::default().fg(if focused { Color::Green } else { Color::Blue }))
        .ratio(spec.ratio(value))
        .label(label);
    frame.render_widget(gauge, area);
}
