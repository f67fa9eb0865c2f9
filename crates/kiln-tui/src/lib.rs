//! kiln-tui: terminal UI components
//!
//! Chat widgets built on ratatui and crossterm: the transcript view,
//! input line, grouped model picker, system-prompt editor, and the
//! slash-command completion popup.

pub mod input;
pub mod theme;
pub mod widgets;

pub use theme::Theme;
