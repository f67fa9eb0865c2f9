//! Session event types

use kiln_api::GenerateEvent;
use serde::{Deserialize, Serialize};

/// Change notifications emitted by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The message history changed (append, streaming update, clear)
    HistoryChanged,
    /// The configuration changed (model, system prompt, streaming)
    ConfigChanged,
}

/// A generate event tagged with the request generation it belongs to.
///
/// The session compares the tag against its current generation and
/// silently discards events from superseded requests.
#[derive(Debug, Clone)]
pub struct WorkerEvent {
    pub generation: u64,
    pub event: GenerateEvent,
}
