use crate::ui::conversation::commands::{parse_slash_command, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the conversation composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    /// Text was typed or deleted
    Edited,
    None,
}

/// Editable text with a cursor counted in characters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextInput {
    content: String,
    cursor: usize,
}

impl TextInput {
    pub fn with_content(content: impl Into<String>) -> Self {
        let content = content.into();
        let cursor = content.chars().count();
        Self { content, cursor }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn set(&mut self, content: impl Into<String>) {
        *self = Self::with_content(content);
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.content
            .char_indices()
            .nth(chars)
            .map(|(offset, _)| offset)
            .unwrap_or(self.content.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let offset = self.byte_offset(self.cursor);
        self.content.insert(offset, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        let offset = self.byte_offset(self.cursor);
        self.content.insert_str(offset, text);
        self.cursor += text.chars().count();
    }

    /// Delete character before cursor
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let offset = self.byte_offset(self.cursor);
        self.content.remove(offset);
        true
    }

    /// Delete character at cursor
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.content.chars().count() {
            return false;
        }
        let offset = self.byte_offset(self.cursor);
        self.content.remove(offset);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.content.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.content.chars().count();
    }

    /// Apply an editing key. Returns whether the content changed.
    pub fn handle_edit_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                self.insert_char(c);
                true
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.move_left();
                false
            }
            KeyCode::Right => {
                self.move_right();
                false
            }
            KeyCode::Home => {
                self.move_home();
                false
            }
            KeyCode::End => {
                self.move_end();
                false
            }
            _ => false,
        }
    }

    /// Content with a block cursor inserted, for display
    pub fn with_cursor_marker(&self) -> String {
        let mut shown = self.content.clone();
        shown.insert(self.byte_offset(self.cursor), '▌');
        shown
    }
}

/// Chat input box
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    input: TextInput,
    placeholder: String,
    has_focus: bool,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: TextInput::default(),
            placeholder: placeholder.into(),
            has_focus: true,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.input.insert_char('\n');
                ComposerResult::Edited
            }
            KeyCode::Enter => {
                if self.input.content().trim().is_empty() {
                    return ComposerResult::None;
                }
                let content = self.input.take();
                match parse_slash_command(&content) {
                    Some(command) => ComposerResult::Command(command),
                    None => ComposerResult::Submitted(content),
                }
            }
            _ => {
                if self.input.handle_edit_key(key) {
                    ComposerResult::Edited
                } else {
                    ComposerResult::None
                }
            }
        }
    }

    pub fn paste(&mut self, text: &str) {
        self.input.insert_str(text);
    }

    /// Set focus state
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    #[cfg(test)]
    pub fn content(&self) -> &str {
        self.input.content()
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Type your message… (Enter to send, /help for commands)")
            .style(if self.has_focus {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);
        if inner_area.is_empty() {
            return;
        }

        if self.input.is_empty() && !self.has_focus {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            return;
        }

        let content = if self.has_focus {
            self.input.with_cursor_marker()
        } else {
            self.input.content().to_string()
        };

        // Keep the cursor line visible when the input has more lines than fit
        let lines: Vec<&str> = content.split('\n').collect();
        let start = lines.len().saturating_sub(inner_area.height as usize);
        for (i, line_text) in lines[start..].iter().enumerate() {
            let line = Line::from(vec![Span::raw(*line_text)]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}
