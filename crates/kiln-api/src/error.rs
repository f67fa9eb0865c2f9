//! Error types for kiln-api

use thiserror::Error;

/// Result type alias using kiln-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the inference server
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level failure (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl Error {
    /// Create a status error from a status code and body text
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Check whether this error is a request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_carries_code_and_body() {
        let e = Error::status(500, "model runner crashed");
        let text = e.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("model runner crashed"));
    }

    #[test]
    fn test_json_error_is_not_timeout() {
        let bad: serde_json::Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!Error::from(bad).is_timeout());
    }
}
