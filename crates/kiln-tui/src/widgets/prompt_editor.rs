//! System prompt editor popup

use crate::input::Action;
use crate::theme::Theme;
use crate::widgets::input_box::InputBox;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

/// Popup for editing the system prompt template and the streaming flag.
///
/// Enter saves, Tab toggles streaming, Esc cancels; the caller handles
/// those keys, this widget only edits.
#[derive(Debug, Default)]
pub struct PromptEditor {
    input: InputBox,
    streaming: bool,
    visible: bool,
}

impl PromptEditor {
    pub fn new() -> Self {
        Self {
            input: InputBox::new().with_placeholder("Enter system prompt..."),
            streaming: false,
            visible: false,
        }
    }

    /// Open with the current template and streaming flag
    pub fn open(&mut self, prompt: &str, streaming: bool) {
        self.input.set_content(prompt);
        self.input.set_focused(true);
        self.streaming = streaming;
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The edited template
    pub fn prompt(&self) -> &str {
        self.input.content()
    }

    /// The edited streaming flag
    pub fn streaming(&self) -> bool {
        self.streaming
    }

    pub fn toggle_streaming(&mut self) {
        self.streaming = !self.streaming;
    }

    /// Forward an editing action to the text field
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        self.input.handle_action(action, width)
    }

    /// Render centered in `area`
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let width = (area.width * 7 / 10).clamp(30, 90).min(area.width);
        let height = 9.min(area.height);
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let popup = Rect::new(x, y, width, height);

        Clear.render(popup, buf);

        let block = Block::default()
            .title(" System Prompt ")
            .title_style(theme.accent_bold())
            .title_bottom(Line::from(Span::styled(
                " Enter save · Tab toggle streaming · Esc cancel ",
                theme.dim_style(),
            )))
            .borders(Borders::ALL)
            .border_style(theme.accent_style());
        let inner = block.inner(popup);
        block.render(popup, buf);

        if inner.height < 6 {
            return;
        }

        let hint = Paragraph::new(vec![
            Line::from(Span::styled(
                "Sent to the model with every message.",
                theme.dim_style(),
            )),
            Line::from(Span::styled(
                "%model% → model name · %parameters% → parameter count",
                theme.dim_style(),
            )),
        ]);
        hint.render(Rect::new(inner.x, inner.y, inner.width, 2), buf);

        let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 3);
        self.input.render(input_area, buf, theme);

        let check = if self.streaming { "[x]" } else { "[ ]" };
        let toggle = Paragraph::new(Line::from(vec![
            Span::styled(format!("{check} "), theme.accent_style()),
            Span::styled("Stream responses", theme.base_style()),
        ]));
        toggle.render(Rect::new(inner.x, inner.y + 5, inner.width, 1), buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_loads_current_values() {
        let mut editor = PromptEditor::new();
        editor.open("be kind", true);
        assert!(editor.is_visible());
        assert_eq!(editor.prompt(), "be kind");
        assert!(editor.streaming());
    }

    #[test]
    fn test_toggle_streaming() {
        let mut editor = PromptEditor::new();
        editor.open("", false);
        editor.toggle_streaming();
        assert!(editor.streaming());
        editor.toggle_streaming();
        assert!(!editor.streaming());
    }

    #[test]
    fn test_editing_goes_to_the_text_field() {
        let mut editor = PromptEditor::new();
        editor.open("x", false);
        editor.handle_action(&Action::Char('y'), 80);
        assert_eq!(editor.prompt(), "xy");
    }
}
