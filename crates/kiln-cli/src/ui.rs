//! TUI implementation for kiln

use std::time::Instant;

use crossterm::{
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, EventStream, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
    },
};
use tokio::sync::{broadcast, mpsc};

use kiln_api::{GenerateEvent, ModelDescriptor, OllamaClient, model::group_by_family};
use kiln_session::{
    ChatSession, SessionError, SessionEvent, Submission, WorkerEvent, run_request,
};
use kiln_tui::{
    Theme,
    input::{Action, key_to_action},
    widgets::{
        ChatMessage, InputBox, MessageList, ModelEntry, ModelGroup, ModelPicker,
        PredictionEntry, Predictions, PromptEditor, Spinner, message_list,
    },
};

use crate::commands::{self, CommandAction};
use crate::config::Config;

type ModelListResult = kiln_api::Result<Vec<String>>;

/// Whether the event loop keeps running
enum Flow {
    Continue,
    Quit,
}

/// The interactive application: view state plus the session it renders.
///
/// All session mutation happens on this task; workers only talk back
/// through the mpsc channel.
struct Tui {
    session: ChatSession,
    client: OllamaClient,
    config: Config,

    /// Display mirror of the transcript (history plus UI notices)
    messages: Vec<ChatMessage>,
    input: InputBox,
    scroll: usize,
    is_processing: bool,
    status: String,
    model_label: String,
    theme: Theme,
    spinner_start: Instant,

    picker: ModelPicker,
    editor: PromptEditor,
    predictions: Vec<PredictionEntry>,
    prediction_selected: usize,

    worker_tx: mpsc::Sender<WorkerEvent>,
    models_tx: mpsc::Sender<ModelListResult>,
}

impl Tui {
    fn new(
        session: ChatSession,
        client: OllamaClient,
        config: Config,
        worker_tx: mpsc::Sender<WorkerEvent>,
        models_tx: mpsc::Sender<ModelListResult>,
    ) -> Self {
        let mut input = InputBox::new().with_placeholder("Ask anything, or type / for commands");
        input.set_focused(true);

        let mut picker = ModelPicker::new();
        let model = session.config().model.clone();
        if !model.is_empty() {
            picker.set_active(Some(model));
        }

        let mut tui = Self {
            session,
            client,
            config,
            messages: Vec::new(),
            input,
            scroll: 0,
            is_processing: false,
            status: "Ready".to_string(),
            model_label: String::new(),
            theme: Theme::dark(),
            spinner_start: Instant::now(),
            picker,
            editor: PromptEditor::new(),
            predictions: Vec::new(),
            prediction_selected: 0,
            worker_tx,
            models_tx,
        };
        tui.refresh_status();
        tui
    }

    /// Fetch the model list off the interactive task
    fn spawn_model_fetch(&mut self) {
        self.picker.set_status("Fetching models...");
        let client = self.client.clone();
        let tx = self.models_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(client.list_models().await).await;
        });
    }

    fn apply_model_list(&mut self, result: ModelListResult) {
        match result {
            Ok(names) if names.is_empty() => {
                self.picker.set_status("No models found");
            }
            Ok(names) => {
                let groups = group_by_family(&names)
                    .into_iter()
                    .map(|(family, models)| ModelGroup {
                        family,
                        models: models
                            .into_iter()
                            .map(|descriptor| ModelEntry {
                                label: descriptor.label(),
                                identifier: descriptor.original_identifier,
                            })
                            .collect(),
                    })
                    .collect();
                self.picker.set_groups(groups);
            }
            Err(e) => {
                self.picker.set_status(format!("Error: {e}"));
                self.notice(format!("Failed to fetch models: {e}"));
            }
        }
    }

    fn notice(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::notice(content));
        self.scroll_to_bottom();
    }

    fn scroll_to_bottom(&mut self) {
        // Resolved against content height during render
        self.scroll = usize::MAX;
    }

    fn refresh_status(&mut self) {
        let config = self.session.config();
        self.model_label = if config.model.is_empty() {
            "no model".to_string()
        } else {
            ModelDescriptor::parse(&config.model).label()
        };
        if !self.is_processing {
            self.status = if config.streaming {
                "Ready · streaming".to_string()
            } else {
                "Ready".to_string()
            };
        }
    }

    fn refresh_predictions(&mut self) {
        self.predictions = commands::predictions(self.input.content())
            .into_iter()
            .map(|spec| PredictionEntry {
                command: spec.token.to_string(),
                description: spec.description.to_string(),
            })
            .collect();
        if self.prediction_selected >= self.predictions.len() {
            self.prediction_selected = 0;
        }
    }

    /// Mirror an applied worker event into the display transcript.
    /// Must stay in step with `ChatSession::apply`.
    fn integrate(&mut self, event: &GenerateEvent) {
        match event {
            GenerateEvent::Chunk { delta } => {
                match self.messages.last_mut() {
                    Some(last) if last.streaming => last.content.push_str(delta),
                    _ => self
                        .messages
                        .push(ChatMessage::assistant_streaming(delta.clone())),
                }
            }
            GenerateEvent::Done { text } => {
                match self.messages.last_mut() {
                    Some(last) if last.streaming => {
                        if last.content.is_empty() {
                            last.content = text.clone();
                        }
                        last.streaming = false;
                    }
                    _ => self.messages.push(ChatMessage::assistant(text.clone())),
                }
            }
            GenerateEvent::Error { message } => {
                self.close_streaming_tail();
                self.messages
                    .push(ChatMessage::error(format!("Error: {message}")));
            }
        }
        self.scroll_to_bottom();
    }

    /// Finalize a trailing streaming bubble. An empty placeholder has
    /// no counterpart in the session history and is dropped outright.
    fn close_streaming_tail(&mut self) {
        let Some(last) = self.messages.last() else {
            return;
        };
        if !last.streaming {
            return;
        }
        if last.content.is_empty() {
            self.messages.pop();
        } else if let Some(last) = self.messages.last_mut() {
            last.streaming = false;
        }
    }

    fn handle_worker_event(&mut self, worker_event: WorkerEvent) {
        let event = worker_event.event.clone();
        let applied = self.session.apply(worker_event);
        if !applied {
            return;
        }
        self.integrate(&event);
        if event.is_terminal() {
            self.is_processing = false;
            self.refresh_status();
        }
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::HistoryChanged => self.scroll_to_bottom(),
            SessionEvent::ConfigChanged => {
                let model = self.session.config().model.clone();
                if !model.is_empty() {
                    self.picker.set_active(Some(model));
                }
                self.refresh_status();
            }
        }
    }

    /// Empty the conversation. The session bumps its generation, so a
    /// request still in flight cannot repopulate it; the spinner stops
    /// because its terminal event will be stale.
    fn clear_conversation(&mut self) {
        self.session.clear();
        self.messages.clear();
        self.scroll = 0;
        self.is_processing = false;
        self.refresh_status();
    }

    fn submit_input(&mut self) -> Flow {
        let text = self.input.take();
        self.refresh_predictions();

        match self.session.submit(&text) {
            Ok(Submission::Empty) => Flow::Continue,
            Ok(Submission::Command(command)) => self.run_command(&command),
            Ok(Submission::Request(pending)) => {
                // A superseded request's bubble stops streaming now;
                // its late events fail the generation check anyway.
                self.close_streaming_tail();
                self.messages.push(ChatMessage::user(text));
                self.messages.push(ChatMessage::assistant_streaming(""));
                self.scroll_to_bottom();
                self.is_processing = true;
                self.spinner_start = Instant::now();
                self.status = format!("Waiting for {}...", self.model_label);
                tokio::spawn(run_request(
                    self.client.clone(),
                    pending,
                    self.worker_tx.clone(),
                ));
                Flow::Continue
            }
            Err(SessionError::ModelRequired) => {
                // Keep the message so it isn't lost while picking
                self.input.set_content(text);
                self.notice("Select a model first.");
                self.picker.show();
                Flow::Continue
            }
        }
    }

    fn run_command(&mut self, command: &str) -> Flow {
        match commands::interpret(command) {
            Some(CommandAction::ClearHistory) => {
                self.clear_conversation();
                Flow::Continue
            }
            Some(CommandAction::OpenModelPicker) => {
                self.picker.show();
                Flow::Continue
            }
            Some(CommandAction::OpenSystemPrompt) => {
                let config = self.session.config();
                let prompt = config.system_prompt.clone();
                let streaming = config.streaming;
                self.editor.open(&prompt, streaming);
                Flow::Continue
            }
            Some(CommandAction::Exit) => Flow::Quit,
            None => {
                let token = command.split_whitespace().next().unwrap_or(command);
                self.notice(format!("Unknown command: {token}"));
                Flow::Continue
            }
        }
    }

    fn save_prompt_editor(&mut self) {
        let prompt = self.editor.prompt().trim().to_string();
        let streaming = self.editor.streaming();
        self.editor.close();

        self.session.set_system_prompt(prompt.clone());
        self.session.set_streaming_enabled(streaming);

        self.config.system_prompt = prompt;
        self.config.use_streaming = streaming;
        if let Err(e) = self.config.save() {
            tracing::warn!(error = %e, "failed to save config");
            self.notice(format!("Could not save configuration: {e}"));
        }
    }

    fn handle_action(&mut self, action: Action, width: u16) -> Flow {
        // Popups capture input while visible
        if self.editor.is_visible() {
            match action {
                Action::Submit => self.save_prompt_editor(),
                Action::Tab => self.editor.toggle_streaming(),
                Action::Escape => self.editor.close(),
                Action::Interrupt | Action::Quit => return Flow::Quit,
                other => {
                    self.editor.handle_action(&other, width);
                }
            }
            return Flow::Continue;
        }

        if self.picker.is_visible() {
            match action {
                Action::Up => self.picker.up(),
                Action::Down => self.picker.down(),
                Action::Submit => {
                    if let Some(entry) = self.picker.selected() {
                        let identifier = entry.identifier.clone();
                        let label = entry.label.clone();
                        let endpoint = self.client.base_url().to_string();
                        self.session.select_model(identifier, endpoint);
                        self.notice(format!("Switched to {label}"));
                    }
                    self.picker.hide();
                }
                Action::Char('r') => self.spawn_model_fetch(),
                Action::Escape | Action::ModelSelect => self.picker.hide(),
                Action::Interrupt | Action::Quit => return Flow::Quit,
                _ => {}
            }
            return Flow::Continue;
        }

        match action {
            Action::Submit => return self.submit_input(),
            Action::Tab => {
                if let Some(entry) = self.predictions.get(self.prediction_selected) {
                    self.input.set_content(format!("{} ", entry.command));
                    self.refresh_predictions();
                }
            }
            Action::Up if !self.predictions.is_empty() => {
                let count = self.predictions.len();
                self.prediction_selected = (self.prediction_selected + count - 1) % count;
            }
            Action::Down if !self.predictions.is_empty() => {
                self.prediction_selected = (self.prediction_selected + 1) % self.predictions.len();
            }
            Action::Escape => {
                self.predictions.clear();
            }
            Action::Interrupt | Action::Quit => return Flow::Quit,
            Action::Clear => self.clear_conversation(),
            Action::ModelSelect => self.picker.show(),
            Action::PageUp => self.scroll = self.scroll.saturating_sub(10),
            Action::PageDown => self.scroll = self.scroll.saturating_add(10),
            other => {
                if self.input.handle_action(&other, width) {
                    self.refresh_predictions();
                }
            }
        }
        Flow::Continue
    }

    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Transcript
                Constraint::Length(1), // Status
                Constraint::Length(3), // Input
            ])
            .split(size);

        self.render_transcript(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.input.render(chunks[2], frame.buffer_mut(), &self.theme);

        if !self.predictions.is_empty() {
            Predictions::new(&self.predictions, self.prediction_selected, &self.theme)
                .render(size, chunks[2], frame.buffer_mut());
        }
        if self.picker.is_visible() {
            self.picker.render(size, frame.buffer_mut(), &self.theme);
        }
        if self.editor.is_visible() {
            self.editor.render(size, frame.buffer_mut(), &self.theme);
        }
    }

    fn render_transcript(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(format!(" kiln │ {} ", self.model_label));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 {
            return;
        }

        if self.messages.is_empty() {
            frame.render_widget(self.welcome(), inner);
            return;
        }

        let content_height =
            message_list::content_height(&self.messages, &self.theme, inner.width as usize);
        let viewport = inner.height as usize;
        self.scroll = self.scroll.min(content_height.saturating_sub(viewport));

        let list = MessageList::new(&self.messages, &self.theme).scroll(self.scroll);
        frame.render_widget(list, inner);

        if content_height > viewport {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");
            let mut scrollbar_state = ScrollbarState::new(content_height)
                .position(self.scroll)
                .viewport_content_length(viewport);
            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn welcome(&self) -> Paragraph<'static> {
        let dim = self.theme.dim_style();
        let accent = self.theme.accent_style();
        let base = self.theme.base_style();

        let mut lines = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  ▲ ", self.theme.accent_bold()),
                Span::styled("kiln", self.theme.accent_bold()),
                Span::styled(" - chat with local models", dim),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("  Model: {}", self.model_label),
                dim,
            )),
            Line::from(""),
            Line::from(Span::styled("  Commands", self.theme.accent_bold())),
            Line::from(""),
        ];
        for spec in commands::COMMANDS {
            lines.push(Line::from(vec![
                Span::styled(format!("    {:<10}", spec.token), accent),
                Span::styled(spec.description.to_string(), base),
            ]));
        }
        lines.extend([
            Line::from(""),
            Line::from(Span::styled("  Keys", self.theme.accent_bold())),
            Line::from(""),
            Line::from(vec![
                Span::styled("    Enter     ", accent),
                Span::styled("Send message", base),
            ]),
            Line::from(vec![
                Span::styled("    Tab       ", accent),
                Span::styled("Complete a command", base),
            ]),
            Line::from(vec![
                Span::styled("    Ctrl+K    ", accent),
                Span::styled("Select model", base),
            ]),
            Line::from(vec![
                Span::styled("    Ctrl+L    ", accent),
                Span::styled("Clear conversation", base),
            ]),
            Line::from(vec![
                Span::styled("    Ctrl+C    ", accent),
                Span::styled("Quit", base),
            ]),
            Line::from(""),
            Line::from(Span::styled("  Type a message to get started...", dim)),
        ]);
        Paragraph::new(lines)
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.is_processing {
            let spinner =
                Spinner::new(&self.status, &self.theme).with_start_time(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let left = format!("{} │ {}", self.model_label, self.status);
        let right = "Ctrl+K: model │ Ctrl+L: clear │ Ctrl+C: quit";
        let left_width = left.chars().count();
        let right_width = right.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            let spacing = available - left_width - right_width;
            Line::from(vec![
                Span::styled(left, self.theme.dim_style()),
                Span::raw(" ".repeat(spacing)),
                Span::styled(right, self.theme.dim_style()),
            ])
        } else {
            Line::from(Span::styled(left, self.theme.dim_style()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Run the TUI application
pub async fn run_tui(
    client: OllamaClient,
    session: ChatSession,
    config: Config,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (worker_tx, mut worker_rx) = mpsc::channel::<WorkerEvent>(32);
    let (models_tx, mut models_rx) = mpsc::channel::<ModelListResult>(4);
    let mut session_rx = session.subscribe();

    let mut app = Tui::new(session, client, config, worker_tx, models_tx);
    app.spawn_model_fetch();

    let mut event_stream = EventStream::new();
    let mut tick = tokio::time::interval(std::time::Duration::from_millis(80));

    let result = loop {
        terminal.draw(|frame| app.render(frame))?;
        let width = terminal.size()?.width;

        tokio::select! {
            biased;

            // Worker events first: they keep streaming responsive
            Some(worker_event) = worker_rx.recv() => {
                app.handle_worker_event(worker_event);
            }

            Some(models) = models_rx.recv() => {
                app.apply_model_list(models);
            }

            changed = session_rx.recv() => {
                match changed {
                    Ok(event) => app.handle_session_event(event),
                    Err(broadcast::error::RecvError::Lagged(_)) => app.scroll_to_bottom(),
                    Err(broadcast::error::RecvError::Closed) => {}
                }
            }

            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => {
                        let action = key_to_action(key);
                        if let Flow::Quit = app.handle_action(action, width) {
                            break Ok(());
                        }
                    }
                    Some(Ok(Event::Paste(text))) => {
                        app.handle_action(Action::Paste(text), width);
                    }
                    Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                        MouseEventKind::ScrollUp => {
                            app.scroll = app.scroll.saturating_sub(3);
                        }
                        MouseEventKind::ScrollDown => {
                            app.scroll = app.scroll.saturating_add(3);
                        }
                        _ => {}
                    },
                    Some(Ok(Event::Resize(_, _))) => {}
                    Some(Err(e)) => break Err(anyhow::anyhow!("event error: {e}")),
                    None => break Ok(()),
                    _ => {}
                }
            }

            // Tick drives the spinner and thinking animation
            _ = tick.tick() => {}
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    result
}
