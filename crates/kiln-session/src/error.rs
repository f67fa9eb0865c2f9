//! Error types for kiln-session

use thiserror::Error;

/// Errors surfaced to the caller before a request is started
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// No model has been selected yet
    #[error("no model selected")]
    ModelRequired,
}
