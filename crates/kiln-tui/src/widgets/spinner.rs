//! Animated spinner for the status line

use crate::theme::Theme;
use ratatui::{buffer::Buffer, layout::Rect, text::Span, widgets::Widget};
use std::time::{Duration, Instant};

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Braille spinner with a label, animated from a fixed start instant
pub struct Spinner<'a> {
    label: &'a str,
    theme: &'a Theme,
    start: Instant,
}

impl<'a> Spinner<'a> {
    pub fn new(label: &'a str, theme: &'a Theme) -> Self {
        Self {
            label,
            theme,
            start: Instant::now(),
        }
    }

    /// Animate relative to a stable start time so redraws don't jitter
    pub fn with_start_time(mut self, start: Instant) -> Self {
        self.start = start;
        self
    }

    fn frame(&self) -> &'static str {
        let ticks = self.start.elapsed().as_millis() / FRAME_DURATION.as_millis();
        FRAMES[ticks as usize % FRAMES.len()]
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 {
            return;
        }
        let text = format!("{} {}", self.frame(), self.label);
        let span = Span::styled(&text, self.theme.accent_style());
        buf.set_span(area.x, area.y, &span, area.width);
    }
}
