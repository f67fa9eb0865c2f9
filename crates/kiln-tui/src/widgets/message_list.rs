//! Transcript widget

use crate::theme::Theme;
use crate::widgets::markdown::render_markdown;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

/// Who a transcript entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
    /// UI-level notices (command feedback, model switches)
    Notice,
}

/// A single entry in the transcript
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub content: String,
    /// Styled as an error
    pub error: bool,
    /// Still receiving streamed chunks
    pub streaming: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            content: content.into(),
            error: false,
            streaming: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            content: content.into(),
            error: false,
            streaming: false,
        }
    }

    pub fn assistant_streaming(content: impl Into<String>) -> Self {
        Self {
            streaming: true,
            ..Self::assistant(content)
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            error: true,
            ..Self::assistant(content)
        }
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Notice,
            content: content.into(),
            error: false,
            streaming: false,
        }
    }
}

/// Braille frames for the "thinking" indicator shown while a streaming
/// message is still empty
const THINKING_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn thinking_frame() -> &'static str {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    THINKING_FRAMES[(millis / 80) as usize % THINKING_FRAMES.len()]
}

/// Widget rendering the conversation transcript
pub struct MessageList<'a> {
    messages: &'a [ChatMessage],
    theme: &'a Theme,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [ChatMessage], theme: &'a Theme) -> Self {
        Self {
            messages,
            theme,
            scroll: 0,
        }
    }

    /// Set scroll offset in lines
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    fn message_lines(&self, msg: &ChatMessage, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let (name, style, prefix) = match msg.speaker {
            Speaker::User => ("You", self.theme.accent_bold(), "▶ "),
            Speaker::Assistant if msg.error => ("Assistant", self.theme.error_style(), "◀ "),
            Speaker::Assistant => ("Assistant", self.theme.assistant_bold(), "◀ "),
            Speaker::Notice => ("", self.theme.dim_style(), "● "),
        };

        let header = if msg.streaming {
            format!("{prefix}{name} ▌")
        } else {
            format!("{prefix}{name}")
        };
        lines.push(Line::from(Span::styled(header, style)));

        let content_width = width.saturating_sub(2);

        if msg.speaker == Speaker::Assistant && !msg.error {
            if msg.content.is_empty() && msg.streaming {
                lines.push(Line::from(Span::styled(
                    format!("  {} waiting for the model...", thinking_frame()),
                    Style::default().fg(ratatui::style::Color::Yellow),
                )));
            } else {
                for line in render_markdown(&msg.content, self.theme, content_width) {
                    let mut spans = vec![Span::raw("  ")];
                    spans.extend(
                        line.spans
                            .into_iter()
                            .map(|s| Span::styled(s.content.into_owned(), s.style)),
                    );
                    lines.push(Line::from(spans));
                }
            }
        } else {
            let content_style = if msg.error {
                self.theme.error_style()
            } else if msg.speaker == Speaker::Notice {
                self.theme.dim_style().add_modifier(Modifier::ITALIC)
            } else {
                self.theme.base_style()
            };
            for wrapped in textwrap::wrap(&msg.content, content_width.max(1)) {
                lines.push(Line::from(Span::styled(
                    format!("  {wrapped}"),
                    content_style,
                )));
            }
        }

        lines.push(Line::from(""));
        lines
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let mut all_lines: Vec<Line> = Vec::new();
        for msg in self.messages {
            all_lines.extend(self.message_lines(msg, width));
        }

        let visible: Vec<Line> = all_lines
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Total transcript height in lines at the given width; drives scroll
/// clamping and auto-scroll. Must mirror the rendering logic above.
pub fn content_height(messages: &[ChatMessage], theme: &Theme, width: usize) -> usize {
    let list = MessageList::new(messages, theme);
    messages
        .iter()
        .map(|msg| list.message_lines(msg, width).len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_height_counts_header_body_separator() {
        let theme = Theme::dark();
        let messages = vec![ChatMessage::user("hi")];
        // header + one content line + separator
        assert_eq!(content_height(&messages, &theme, 80), 3);
    }

    #[test]
    fn test_empty_streaming_message_shows_indicator() {
        let theme = Theme::dark();
        let messages = vec![ChatMessage::assistant_streaming("")];
        let list = MessageList::new(&messages, &theme);
        let lines = list.message_lines(&messages[0], 80);
        let flat: String = lines
            .iter()
            .flat_map(|l| l.spans.iter())
            .map(|s| s.content.as_ref())
            .collect();
        assert!(flat.contains("waiting for the model"));
        assert!(flat.contains('▌'));
    }

    #[test]
    fn test_long_user_message_wraps() {
        let theme = Theme::dark();
        let messages = vec![ChatMessage::user("word ".repeat(40))];
        assert!(content_height(&messages, &theme, 40) > 4);
    }
}
