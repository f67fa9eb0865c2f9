//! Markdown rendering for the transcript
//!
//! Light rendering only: headings, paragraphs, emphasis, inline and
//! fenced code, lists, block quotes, links. Anything fancier falls
//! through as plain text.

use crate::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

/// Convert markdown text to styled ratatui lines
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut renderer = Renderer {
        theme,
        width,
        lines: Vec::new(),
        current: Vec::new(),
        styles: vec![theme.base_style()],
        quote_depth: 0,
        list_depth: 0,
        in_code_block: false,
        code: String::new(),
    };
    renderer.run(text);

    let mut lines = renderer.lines;
    while lines
        .last()
        .is_some_and(|l| l.spans.iter().all(|s| s.content.trim().is_empty()))
    {
        lines.pop();
    }
    lines
}

struct Renderer<'t> {
    theme: &'t Theme,
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    quote_depth: usize,
    list_depth: usize,
    in_code_block: bool,
    code: String,
}

impl Renderer<'_> {
    fn run(&mut self, text: &str) {
        for event in Parser::new(text) {
            match event {
                Event::Start(tag) => self.start(tag),
                Event::End(tag) => self.end(tag),
                Event::Text(text) => {
                    if self.in_code_block {
                        self.code.push_str(&text);
                    } else {
                        let style = self.style();
                        self.current.push(Span::styled(text.into_string(), style));
                    }
                }
                Event::Code(code) => {
                    let style = self.theme.code_style().add_modifier(Modifier::BOLD);
                    self.current
                        .push(Span::styled(format!("`{code}`"), style));
                }
                Event::SoftBreak => self.current.push(Span::raw(" ")),
                Event::HardBreak => self.flush_line(),
                _ => {}
            }
        }
        self.flush_line();
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_line();
                let style = match level {
                    HeadingLevel::H1 => self
                        .theme
                        .accent_style()
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    HeadingLevel::H2 => self.theme.accent_style().add_modifier(Modifier::BOLD),
                    _ => self.theme.accent_style(),
                };
                self.styles.push(style);
            }
            Tag::Paragraph => self.flush_line(),
            Tag::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.flush_line();
                self.in_code_block = true;
                self.code.clear();
            }
            Tag::List(_) => self.list_depth += 1,
            Tag::Item => {
                self.flush_line();
                let indent = "  ".repeat(self.list_depth.saturating_sub(1));
                self.current
                    .push(Span::styled(format!("{indent}• "), self.theme.dim_style()));
            }
            Tag::Emphasis => {
                let style = self.style().add_modifier(Modifier::ITALIC);
                self.styles.push(style);
            }
            Tag::Strong => {
                let style = self.style().add_modifier(Modifier::BOLD);
                self.styles.push(style);
            }
            Tag::Strikethrough => {
                let style = self.style().add_modifier(Modifier::CROSSED_OUT);
                self.styles.push(style);
            }
            Tag::Link { .. } => self.styles.push(self.theme.link_style()),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.flush_line();
                self.pop_style();
            }
            TagEnd::Paragraph => {
                self.flush_line();
                self.blank_line();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                let style = self.theme.code_style().add_modifier(Modifier::DIM);
                let max = self.width.saturating_sub(4).max(1);
                let code = std::mem::take(&mut self.code);
                for code_line in code.lines() {
                    let mut display: String = code_line.chars().take(max).collect();
                    if display.len() < code_line.len() {
                        display.push('…');
                    }
                    self.lines
                        .push(Line::from(Span::styled(format!("  {display}"), style)));
                }
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.list_depth = self.list_depth.saturating_sub(1);
                if self.list_depth == 0 {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.pop_style();
            }
            _ => {}
        }
    }

    fn style(&self) -> Style {
        *self.styles.last().unwrap_or(&Style::default())
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn flush_line(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let mut spans = Vec::new();
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                self.theme.dim_style(),
            ));
        }
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn blank_line(&mut self) {
        self.lines.push(Line::from(""));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_simple_text() {
        let theme = Theme::dark();
        let lines = render_markdown("Hello, world!", &theme, 80);
        assert_eq!(text_of(&lines), "Hello, world!");
    }

    #[test]
    fn test_code_block() {
        let theme = Theme::dark();
        let lines = render_markdown("```rust\nfn main() {}\n```", &theme, 80);
        assert!(text_of(&lines).contains("fn main() {}"));
    }

    #[test]
    fn test_nested_emphasis_restores_outer_style() {
        let theme = Theme::dark();
        let lines = render_markdown("**bold *italic* more**", &theme, 80);
        let flat = text_of(&lines);
        assert!(flat.contains("bold"));
        assert!(flat.contains("more"));
    }

    #[test]
    fn test_list_items_get_bullets() {
        let theme = Theme::dark();
        let lines = render_markdown("- one\n- two", &theme, 80);
        let flat = text_of(&lines);
        assert!(flat.contains("• one"));
        assert!(flat.contains("• two"));
    }

    #[test]
    fn test_blockquote_prefix() {
        let theme = Theme::dark();
        let lines = render_markdown("> quoted", &theme, 80);
        assert!(text_of(&lines).contains("│ quoted"));
    }

    #[test]
    fn test_no_trailing_blank_lines() {
        let theme = Theme::dark();
        let lines = render_markdown("a paragraph\n\nanother", &theme, 80);
        assert!(!lines.last().unwrap().spans.is_empty());
    }
}
