//! kiln-api: Ollama HTTP API client
//!
//! This crate talks to a local Ollama-compatible inference server:
//! text generation (complete or streamed as newline-delimited JSON),
//! model discovery, and display formatting of raw model identifiers.

pub mod client;
pub mod error;
pub mod model;
pub mod stream;

pub use client::{GenerateRequest, OllamaClient};
pub use error::{Error, Result};
pub use model::ModelDescriptor;
pub use stream::{GenerateEvent, GenerateEventStream};
