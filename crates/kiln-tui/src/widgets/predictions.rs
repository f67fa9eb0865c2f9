//! Slash-command completion popup

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

/// One completion row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionEntry {
    pub command: String,
    pub description: String,
}

/// Popup listing command completions just above the input box
pub struct Predictions<'a> {
    entries: &'a [PredictionEntry],
    selected: usize,
    theme: &'a Theme,
}

impl<'a> Predictions<'a> {
    pub fn new(entries: &'a [PredictionEntry], selected: usize, theme: &'a Theme) -> Self {
        Self {
            entries,
            selected,
            theme,
        }
    }

    /// Render anchored above `input_area`, clipped to `frame_area`
    pub fn render(&self, frame_area: Rect, input_area: Rect, buf: &mut Buffer) {
        if self.entries.is_empty() {
            return;
        }

        let longest = self
            .entries
            .iter()
            .map(|e| e.command.len() + e.description.len() + 5)
            .max()
            .unwrap_or(0);
        let width = (longest as u16 + 2).clamp(20, frame_area.width);
        let height = (self.entries.len() as u16 + 2).min(input_area.y.saturating_sub(frame_area.y));
        if height < 3 {
            return;
        }

        let popup = Rect::new(input_area.x, input_area.y - height, width, height);
        Clear.render(popup, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style());
        let inner = block.inner(popup);
        block.render(popup, buf);

        let lines: Vec<Line> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let command_style = if i == self.selected {
                    self.theme.accent_bold().add_modifier(Modifier::REVERSED)
                } else {
                    self.theme.accent_bold()
                };
                Line::from(vec![
                    Span::styled(entry.command.clone(), command_style),
                    Span::styled(
                        format!("  {}", entry.description),
                        self.theme.dim_style(),
                    ),
                ])
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_nothing_when_empty() {
        let theme = Theme::dark();
        let mut buf = Buffer::empty(Rect::new(0, 0, 40, 10));
        let before = buf.clone();
        Predictions::new(&[], 0, &theme).render(
            Rect::new(0, 0, 40, 10),
            Rect::new(0, 7, 40, 3),
            &mut buf,
        );
        assert_eq!(buf, before);
    }

    #[test]
    fn test_renders_command_rows_above_input() {
        let theme = Theme::dark();
        let mut buf = Buffer::empty(Rect::new(0, 0, 40, 10));
        let entries = vec![PredictionEntry {
            command: "/system".to_string(),
            description: "Configure system prompt".to_string(),
        }];
        Predictions::new(&entries, 0, &theme).render(
            Rect::new(0, 0, 40, 10),
            Rect::new(0, 7, 40, 3),
            &mut buf,
        );
        let row: String = (1..39)
            .filter_map(|x| buf.cell((x, 5)).map(|c| c.symbol().to_string()))
            .collect();
        assert!(row.contains("/system"));
    }
}
