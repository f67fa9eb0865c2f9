//! The conversation session

use kiln_api::{GenerateRequest, GenerateEvent, ModelDescriptor};
use tokio::sync::broadcast;

use crate::error::SessionError;
use crate::events::{SessionEvent, WorkerEvent};
use crate::message::Message;

/// Session configuration.
///
/// `system_prompt` and `streaming` are the persisted fields; the rest
/// lives only for the process lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the inference server
    pub endpoint: String,
    /// Raw model identifier; empty until one is selected
    pub model: String,
    /// System prompt template (`%model%` / `%parameters%` placeholders)
    pub system_prompt: String,
    /// Whether responses stream incrementally
    pub streaming: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: String::new(),
            system_prompt: String::new(),
            streaming: false,
        }
    }
}

/// What `submit` decided to do with the input
#[derive(Debug)]
pub enum Submission {
    /// Empty or whitespace-only input; nothing happened
    Empty,
    /// Slash-prefixed input; dispatch to the command interpreter
    Command(String),
    /// A request is ready to run on a worker
    Request(PendingRequest),
}

/// A ready-to-send request plus the generation that owns it
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub generation: u64,
    pub streaming: bool,
    pub request: GenerateRequest,
}

/// Orchestrator owning the history and configuration.
///
/// At most one request generation is live for integration; events
/// tagged with an older generation are discarded in [`ChatSession::apply`].
pub struct ChatSession {
    history: Vec<Message>,
    config: SessionConfig,
    generation: u64,
    accumulating: bool,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    /// Create a session with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            history: Vec::new(),
            config,
            generation: 0,
            accumulating: false,
            events,
        }
    }

    /// Subscribe to history/configuration change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Ordered read-only view of the conversation
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Current configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Generation of the most recently started request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Process user input.
    ///
    /// Empty input is a no-op and slash-prefixed input is handed back
    /// for command dispatch; neither touches the history. Otherwise the
    /// user message is appended and a [`PendingRequest`] for the
    /// current configuration is returned. Submitting while an earlier
    /// request is still in flight is allowed: the new generation
    /// supersedes it and the old results will be discarded.
    pub fn submit(&mut self, text: &str) -> Result<Submission, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Submission::Empty);
        }
        if text.starts_with('/') {
            return Ok(Submission::Command(text.to_string()));
        }
        if self.config.model.is_empty() {
            return Err(SessionError::ModelRequired);
        }

        self.generation += 1;
        self.accumulating = false;
        self.history.push(Message::user(text));
        self.notify(SessionEvent::HistoryChanged);

        Ok(Submission::Request(PendingRequest {
            generation: self.generation,
            streaming: self.config.streaming,
            request: GenerateRequest {
                model: self.config.model.clone(),
                prompt: text.to_string(),
                stream: self.config.streaming,
                system: self.resolved_system_prompt(),
            },
        }))
    }

    /// The system prompt with template placeholders substituted from
    /// the active model's descriptor; None when the template is empty
    /// (no `system` field is sent at all).
    pub fn resolved_system_prompt(&self) -> Option<String> {
        let template = self.config.system_prompt.trim();
        if template.is_empty() {
            return None;
        }
        let descriptor = ModelDescriptor::parse(&self.config.model);
        Some(
            template
                .replace("%model%", &descriptor.formatted_name)
                .replace("%parameters%", &descriptor.param_count()),
        )
    }

    /// Integrate one worker event into the history.
    ///
    /// Returns false when the event belonged to a superseded request
    /// and was discarded. Must be called from the interactive task;
    /// this is the single-writer discipline that keeps the history
    /// lock-free.
    pub fn apply(&mut self, event: WorkerEvent) -> bool {
        if event.generation != self.generation {
            tracing::debug!(
                stale = event.generation,
                current = self.generation,
                "discarding stale worker event"
            );
            return false;
        }

        match event.event {
            GenerateEvent::Chunk { delta } => {
                if self.accumulating {
                    if let Some(last) = self.history.last_mut() {
                        last.content.push_str(&delta);
                    }
                } else {
                    self.accumulating = true;
                    self.history.push(Message::assistant(delta));
                }
            }
            GenerateEvent::Done { text } => {
                if self.accumulating {
                    // Chunks already account for the full text
                    self.accumulating = false;
                } else {
                    self.history.push(Message::assistant(text));
                }
            }
            GenerateEvent::Error { message } => {
                self.accumulating = false;
                self.history.push(Message::error(format!("Error: {message}")));
            }
        }

        self.notify(SessionEvent::HistoryChanged);
        true
    }

    /// Whether a streaming response is currently accumulating into the
    /// trailing assistant message
    pub fn is_accumulating(&self) -> bool {
        self.accumulating
    }

    /// Empty the history. Configuration is untouched. The generation is
    /// bumped so late results from an in-flight request cannot
    /// resurrect deleted messages.
    pub fn clear(&mut self) {
        self.history.clear();
        self.accumulating = false;
        self.generation += 1;
        self.notify(SessionEvent::HistoryChanged);
    }

    /// Select the active model and endpoint
    pub fn select_model(&mut self, identifier: impl Into<String>, endpoint: impl Into<String>) {
        self.config.model = identifier.into();
        self.config.endpoint = endpoint.into();
        self.notify(SessionEvent::ConfigChanged);
    }

    /// Replace the system prompt template
    pub fn set_system_prompt(&mut self, template: impl Into<String>) {
        self.config.system_prompt = template.into();
        self.notify(SessionEvent::ConfigChanged);
    }

    /// Toggle streaming mode for subsequent requests
    pub fn set_streaming_enabled(&mut self, enabled: bool) {
        self.config.streaming = enabled;
        self.notify(SessionEvent::ConfigChanged);
    }

    fn notify(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn session_with_model() -> ChatSession {
        let mut session = ChatSession::new(SessionConfig::default());
        session.select_model("llama2:13b", "http://localhost:11434");
        session
    }

    fn chunk(generation: u64, delta: &str) -> WorkerEvent {
        WorkerEvent {
            generation,
            event: GenerateEvent::Chunk {
                delta: delta.to_string(),
            },
        }
    }

    fn done(generation: u64, text: &str) -> WorkerEvent {
        WorkerEvent {
            generation,
            event: GenerateEvent::Done {
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn test_empty_submit_is_noop() {
        let mut session = session_with_model();
        assert!(matches!(session.submit("   "), Ok(Submission::Empty)));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_slash_input_is_handed_to_commands() {
        let mut session = session_with_model();
        let result = session.submit("/clear all of it");
        assert!(matches!(result, Ok(Submission::Command(ref c)) if c == "/clear all of it"));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_submit_without_model_is_rejected() {
        let mut session = ChatSession::new(SessionConfig::default());
        assert!(matches!(
            session.submit("hello"),
            Err(SessionError::ModelRequired)
        ));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_submit_appends_user_message_and_builds_request() {
        let mut session = session_with_model();
        let Ok(Submission::Request(pending)) = session.submit("hello there") else {
            panic!("expected a request");
        };
        assert_eq!(pending.generation, 1);
        assert_eq!(pending.request.model, "llama2:13b");
        assert_eq!(pending.request.prompt, "hello there");
        assert!(!pending.request.stream);
        assert!(pending.request.system.is_none());
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].role, Role::User);
    }

    #[test]
    fn test_streaming_flag_carried_into_request() {
        let mut session = session_with_model();
        session.set_streaming_enabled(true);
        let Ok(Submission::Request(pending)) = session.submit("hi") else {
            panic!("expected a request");
        };
        assert!(pending.streaming);
        assert!(pending.request.stream);
    }

    #[test]
    fn test_system_prompt_template_substitution() {
        let mut session = session_with_model();
        session.set_system_prompt("You are %model% with %parameters% billion parameters.");
        let resolved = session.resolved_system_prompt().unwrap();
        assert_eq!(resolved, "You are Llama2 with 13 billion parameters.");
    }

    #[test]
    fn test_unknown_parameter_count_substitution() {
        let mut session = ChatSession::new(SessionConfig::default());
        session.select_model("mistral", "http://localhost:11434");
        session.set_system_prompt("%model%/%parameters%");
        assert_eq!(session.resolved_system_prompt().unwrap(), "Mistral/unknown");
    }

    #[test]
    fn test_empty_template_sends_no_system_field() {
        let mut session = session_with_model();
        session.set_system_prompt("   ");
        assert!(session.resolved_system_prompt().is_none());
    }

    #[test]
    fn test_streaming_accumulation_builds_one_message() {
        let mut session = session_with_model();
        session.set_streaming_enabled(true);
        session.submit("greet me").unwrap();
        let generation = session.generation();

        assert!(session.apply(chunk(generation, "Hel")));
        assert!(session.apply(chunk(generation, "lo")));
        assert!(session.apply(chunk(generation, " world")));
        assert!(session.apply(done(generation, "Hello world")));

        // One user message plus exactly one assistant message
        assert_eq!(session.history().len(), 2);
        let last = session.history().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Hello world");
        assert!(!session.is_accumulating());
    }

    #[test]
    fn test_non_streaming_done_appends_once() {
        let mut session = session_with_model();
        session.submit("hi").unwrap();
        let generation = session.generation();
        session.apply(done(generation, "Hello!"));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].content, "Hello!");
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut session = session_with_model();
        session.set_streaming_enabled(true);

        session.submit("first").unwrap();
        let first = session.generation();
        session.submit("second").unwrap();
        let second = session.generation();
        assert!(second > first);

        // Late chunks from the superseded request must not apply
        assert!(!session.apply(chunk(first, "stale ")));
        assert_eq!(session.history().len(), 2);

        assert!(session.apply(chunk(second, "fresh")));
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history()[2].content, "fresh");
    }

    #[test]
    fn test_error_appends_error_message_and_closes_accumulation() {
        let mut session = session_with_model();
        session.set_streaming_enabled(true);
        session.submit("hi").unwrap();
        let generation = session.generation();

        session.apply(chunk(generation, "par"));
        assert!(session.is_accumulating());
        session.apply(WorkerEvent {
            generation,
            event: GenerateEvent::Error {
                message: "connection reset".to_string(),
            },
        });

        let last = session.history().last().unwrap();
        assert!(last.error);
        assert!(last.content.contains("connection reset"));
        assert!(!session.is_accumulating());
    }

    #[test]
    fn test_clear_empties_history_and_keeps_config() {
        let mut session = session_with_model();
        session.set_system_prompt("keep me");
        session.submit("hi").unwrap();
        let generation = session.generation();
        session.clear();

        assert!(session.history().is_empty());
        assert_eq!(session.config().system_prompt, "keep me");
        assert_eq!(session.config().model, "llama2:13b");
        // A result from the request started before the clear is stale now
        assert!(!session.apply(done(generation, "late")));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_change_notifications() {
        let mut session = session_with_model();
        let mut receiver = session.subscribe();

        session.set_streaming_enabled(true);
        assert!(matches!(receiver.try_recv(), Ok(SessionEvent::ConfigChanged)));

        session.submit("hi").unwrap();
        assert!(matches!(receiver.try_recv(), Ok(SessionEvent::HistoryChanged)));

        let generation = session.generation();
        session.apply(done(generation, "hello"));
        assert!(matches!(receiver.try_recv(), Ok(SessionEvent::HistoryChanged)));
    }
}
