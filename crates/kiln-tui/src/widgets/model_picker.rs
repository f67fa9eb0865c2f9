//! Model picker popup
//!
//! Models are listed grouped by family, the way the discovery endpoint
//! is organized for humans: a non-selectable header row per family,
//! then its models. Navigation moves over model rows only.

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, StatefulWidget, Widget},
};

const MAX_POPUP_WIDTH: u16 = 80;
const MAX_POPUP_HEIGHT: u16 = 20;

/// One selectable model
#[derive(Debug, Clone)]
pub struct ModelEntry {
    /// Raw identifier sent to the API
    pub identifier: String,
    /// Formatted display label (name plus size hint)
    pub label: String,
}

/// A family of models sharing a grouping key
#[derive(Debug, Clone)]
pub struct ModelGroup {
    pub family: String,
    pub models: Vec<ModelEntry>,
}

/// Stateful model picker popup
#[derive(Debug, Default)]
pub struct ModelPicker {
    groups: Vec<ModelGroup>,
    /// Index over model entries, in group order
    selected: usize,
    /// Identifier of the model currently in use
    active: Option<String>,
    visible: bool,
    /// Shown instead of the list while empty (fetching, errors)
    status: Option<String>,
}

impl ModelPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the grouped model list, keeping the active model selected
    pub fn set_groups(&mut self, groups: Vec<ModelGroup>) {
        self.groups = groups;
        self.status = None;
        self.selected = self
            .active
            .as_deref()
            .and_then(|active| {
                self.flattened()
                    .position(|entry| entry.identifier == active)
            })
            .unwrap_or(0);
    }

    /// Mark the model currently in use
    pub fn set_active(&mut self, identifier: Option<String>) {
        self.active = identifier;
    }

    /// Show a status row instead of the list (fetch in progress/failed)
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn flattened(&self) -> impl Iterator<Item = &ModelEntry> {
        self.groups.iter().flat_map(|g| g.models.iter())
    }

    fn model_count(&self) -> usize {
        self.groups.iter().map(|g| g.models.len()).sum()
    }

    /// Move selection up, wrapping
    pub fn up(&mut self) {
        let count = self.model_count();
        if count == 0 {
            return;
        }
        self.selected = if self.selected == 0 {
            count - 1
        } else {
            self.selected - 1
        };
    }

    /// Move selection down, wrapping
    pub fn down(&mut self) {
        let count = self.model_count();
        if count == 0 {
            return;
        }
        self.selected = (self.selected + 1) % count;
    }

    /// The currently highlighted model
    pub fn selected(&self) -> Option<&ModelEntry> {
        self.flattened().nth(self.selected)
    }

    /// Render centered in `area`
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let title = " Select Model ";
        let footer = " Enter select · r refresh · Esc close ";

        let mut items: Vec<ListItem> = Vec::new();
        let mut selected_row = 0;
        let mut max_width = title.len().max(footer.len());
        let mut model_index = 0;

        if let Some(ref status) = self.status {
            max_width = max_width.max(status.len() + 4);
            items.push(ListItem::new(Line::from(Span::styled(
                status.clone(),
                theme.dim_style(),
            ))));
        } else {
            for group in &self.groups {
                max_width = max_width.max(group.family.len() + 4);
                items.push(ListItem::new(Line::from(Span::styled(
                    group.family.clone(),
                    theme.accent_bold(),
                ))));
                for entry in &group.models {
                    max_width = max_width.max(entry.label.len() + 6);
                    let is_active = self.active.as_deref() == Some(entry.identifier.as_str());
                    let is_selected = model_index == self.selected;
                    let marker = if is_active { "● " } else { "  " };
                    let style = if is_selected {
                        ratatui::style::Style::default()
                            .bg(theme.accent)
                            .fg(theme.bg)
                            .add_modifier(Modifier::BOLD)
                    } else if is_active {
                        theme.accent_style()
                    } else {
                        theme.base_style()
                    };
                    if is_selected {
                        selected_row = items.len();
                    }
                    items.push(ListItem::new(Line::from(Span::styled(
                        format!("  {marker}{}", entry.label),
                        style,
                    ))));
                    model_index += 1;
                }
            }
            if items.is_empty() {
                items.push(ListItem::new(Line::from(Span::styled(
                    "No models found",
                    theme.dim_style(),
                ))));
            }
        }

        let width = (max_width as u16 + 4).clamp(24, MAX_POPUP_WIDTH).min(area.width);
        let height = (items.len() as u16 + 2).min(MAX_POPUP_HEIGHT).min(area.height);
        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let popup = Rect::new(x, y, width, height);

        Clear.render(popup, buf);

        let block = Block::default()
            .title(title)
            .title_style(theme.accent_bold())
            .title_bottom(Line::from(Span::styled(footer, theme.dim_style())))
            .borders(Borders::ALL)
            .border_style(theme.accent_style());

        let list = List::new(items)
            .block(block)
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = ListState::default();
        state.select(Some(selected_row));
        StatefulWidget::render(list, popup, buf, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picker_with_two_families() -> ModelPicker {
        let mut picker = ModelPicker::new();
        picker.set_groups(vec![
            ModelGroup {
                family: "Llama2".to_string(),
                models: vec![
                    ModelEntry {
                        identifier: "llama2:7b".to_string(),
                        label: "Llama2 (7b)".to_string(),
                    },
                    ModelEntry {
                        identifier: "llama2:13b".to_string(),
                        label: "Llama2 (13b)".to_string(),
                    },
                ],
            },
            ModelGroup {
                family: "Mistral".to_string(),
                models: vec![ModelEntry {
                    identifier: "mistral:latest".to_string(),
                    label: "Mistral".to_string(),
                }],
            },
        ]);
        picker
    }

    #[test]
    fn test_navigation_skips_group_headers() {
        let mut picker = picker_with_two_families();
        assert_eq!(picker.selected().unwrap().identifier, "llama2:7b");
        picker.down();
        assert_eq!(picker.selected().unwrap().identifier, "llama2:13b");
        picker.down();
        assert_eq!(picker.selected().unwrap().identifier, "mistral:latest");
        picker.down();
        assert_eq!(picker.selected().unwrap().identifier, "llama2:7b");
        picker.up();
        assert_eq!(picker.selected().unwrap().identifier, "mistral:latest");
    }

    #[test]
    fn test_active_model_is_preselected() {
        let mut picker = ModelPicker::new();
        picker.set_active(Some("llama2:13b".to_string()));
        picker.set_groups(picker_with_two_families().groups);
        assert_eq!(picker.selected().unwrap().identifier, "llama2:13b");
    }

    #[test]
    fn test_empty_picker_has_no_selection() {
        let mut picker = ModelPicker::new();
        picker.up();
        picker.down();
        assert!(picker.selected().is_none());
    }
}
