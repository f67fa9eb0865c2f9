//! kiln-session: conversation state and request orchestration
//!
//! Holds the ordered message history and the session configuration,
//! turns user input into inference requests, and integrates worker
//! events back into the history. All mutation happens on the caller's
//! task; worker events are marshaled over a channel first, so the
//! history has a single writer and needs no locking.

pub mod error;
pub mod events;
pub mod message;
pub mod session;
pub mod worker;

pub use error::SessionError;
pub use events::{SessionEvent, WorkerEvent};
pub use message::{Message, Role};
pub use session::{ChatSession, PendingRequest, SessionConfig, Submission};
pub use worker::run_request;
