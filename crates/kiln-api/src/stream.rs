//! Streaming event types

use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a generate call runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerateEvent {
    /// Incremental text chunk (streaming mode only)
    Chunk { delta: String },
    /// Call completed; `text` is the full response (concatenation of
    /// all chunks in streaming mode, the whole body otherwise)
    Done { text: String },
    /// Call failed; no further events follow
    Error { message: String },
}

impl GenerateEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerateEvent::Done { .. } | GenerateEvent::Error { .. }
        )
    }
}

/// A finite, non-restartable stream of generate events.
///
/// Chunks arrive in send order; the terminal event is always last.
pub type GenerateEventStream = Pin<Box<dyn Stream<Item = GenerateEvent> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(GenerateEvent::Done { text: "x".into() }.is_terminal());
        assert!(
            GenerateEvent::Error {
                message: "boom".into()
            }
            .is_terminal()
        );
        assert!(
            !GenerateEvent::Chunk {
                delta: "hi".into()
            }
            .is_terminal()
        );
    }
}
