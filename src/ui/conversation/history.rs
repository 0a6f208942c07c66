//! Transcript display component

use crate::conversation::Message;
use crate::events::Role;
use crate::streaming::ERROR_MARKER;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const USER_PREFIX: &str = "🧑 You: ";
const BOT_PREFIX: &str = "🤖 Bot: ";

/// Transcript view for one frame: stored messages plus the reply in progress
pub struct ConversationHistory<'a> {
    messages: Vec<&'a Message>,
    streaming_message: Option<&'a str>,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: impl Iterator<Item = &'a Message>) -> Self {
        Self { messages: messages.collect(), streaming_message: None }
    }

    /// Show `partial` as the assistant reply being streamed
    pub fn with_streaming_message(mut self, partial: Option<&'a str>) -> Self {
        self.streaming_message = partial;
        self
    }

    /// All transcript lines at the given width, oldest first
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for message in &self.messages {
            all_lines.extend(render_message(message.role, &message.content, width, false));
            all_lines.push(Line::default());
        }
        if let Some(partial) = self.streaming_message {
            all_lines.extend(render_message(Role::Assistant, partial, width, true));
        }
        all_lines
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("🤖 Chatbot");
        let inner_area = block.inner(area);
        block.render(area, buf);
        if inner_area.is_empty() {
            return;
        }

        if self.messages.is_empty() && self.streaming_message.is_none() {
            let welcome = Line::from(Span::styled(
                "Say hello below. Pick a persona and tune the sliders on the left.",
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner_area.x, inner_area.y, &welcome, inner_area.width);
            return;
        }

        // Bottom-anchored: the newest lines stay in view
        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let start = all_lines.len().saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Render a single message into lines
fn render_message(role: Role, content: &str, width: u16, streaming: bool) -> Vec<Line<'static>> {
    let (prefix, prefix_style) = match role {
        Role::User => (USER_PREFIX, Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
        Role::Assistant => (BOT_PREFIX, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Role::System => ("", Style::default()),
    };
    let content_style = if role == Role::Assistant && content.starts_with(ERROR_MARKER) {
        Style::default().fg(Color::Red)
    } else {
        get_content_style(role)
    };

    let prefix_width = prefix.chars().count() + 1;
    let wrapped = wrap_text(content, (width as usize).saturating_sub(prefix_width).max(1));
    let last = wrapped.len().saturating_sub(1);

    wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut spans = if i == 0 {
                vec![Span::styled(prefix, prefix_style)]
            } else {
                vec![Span::raw(" ".repeat(prefix_width.saturating_sub(1)))]
            };
            spans.push(Span::styled(text, content_style));
            if streaming && i == last {
                spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
            }
            Line::from(spans)
        })
        .collect()
}

/// Word-wrap to `width` columns, keeping explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.chars().count();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }
            current_line.push_str(word);
            current_width += word_width;
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Get content style based on role
fn get_content_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::White),
        Role::Assistant => Style::default().fg(Color::Green),
        Role::System => Style::default().fg(Color::Yellow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn wraps_on_word_boundaries_and_keeps_newlines() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn roles_get_their_prefixes() {
        let messages = vec![Message::system("hidden"), Message::user("hi"), Message::assistant("hello")];
        let history = ConversationHistory::new(messages.iter().filter(|m| m.role != Role::System));

        let lines: Vec<String> = history.lines(80).iter().map(text_of).collect();
        assert_eq!(lines, vec!["🧑 You: hi", "", "🤖 Bot: hello", ""]);
    }

    #[test]
    fn streaming_reply_ends_with_a_cursor() {
        let messages = vec![Message::user("hi")];
        let history = ConversationHistory::new(messages.iter()).with_streaming_message(Some("4 is"));

        let lines: Vec<String> = history.lines(80).iter().map(text_of).collect();
        assert_eq!(lines.last().map(String::as_str), Some("🤖 Bot: 4 is▋"));
    }
}
