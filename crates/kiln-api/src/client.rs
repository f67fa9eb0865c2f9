//! HTTP client for the Ollama generate/tags API

use async_stream::stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    error::{Error, Result},
    stream::{GenerateEvent, GenerateEventStream},
};

/// Upper bound on any single request, streaming included
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for an Ollama-compatible inference server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

/// Body of a generate call
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// One newline-delimited fragment of a streaming response
#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaClient {
    /// Create a client for the given base URL (e.g. `http://localhost:11434`)
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The configured endpoint
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List installed model identifiers from `/api/tags`
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        tracing::debug!(%url, "fetching model list");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), body));
        }

        let tags: TagsResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Run one non-streaming generate call and return the full response text.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        tracing::debug!(model = %request.model, "sending generate request");

        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), body));
        }

        let body: GenerateResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(body
            .response
            .unwrap_or_else(|| "No response content".to_string()))
    }

    /// Run one streaming generate call.
    ///
    /// The returned stream yields a `Chunk` per newline-delimited JSON
    /// fragment carrying text, then exactly one terminal event: `Done`
    /// with the full concatenated text, or `Error`. A non-success
    /// initial status produces an `Error` event instead of chunks.
    /// Lines that fail to parse are skipped with a warning.
    pub fn generate_stream(&self, request: &GenerateRequest) -> GenerateEventStream {
        let http = self.http.clone();
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            stream: true,
            ..request.clone()
        };

        Box::pin(stream! {
            tracing::debug!(model = %request.model, "sending streaming generate request");
            let response = match http.post(&url).json(&request).send().await {
                Ok(response) => response,
                Err(e) => {
                    yield GenerateEvent::Error {
                        message: format!("network error: {e}"),
                    };
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                yield GenerateEvent::Error {
                    message: format!("server returned status {}: {}", status.as_u16(), body),
                };
                return;
            }

            let mut lines = LineBuffer::default();
            let mut accumulated = String::new();
            let mut bytes = response.bytes_stream();

            'read: while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield GenerateEvent::Error {
                            message: format!("stream interrupted: {e}"),
                        };
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    let Some(fragment) = parse_stream_line(&line) else {
                        continue;
                    };
                    if let Some(delta) = fragment.response {
                        if !delta.is_empty() {
                            accumulated.push_str(&delta);
                            yield GenerateEvent::Chunk { delta };
                        }
                    }
                    if fragment.done {
                        break 'read;
                    }
                }
            }

            // A response that ends without a final newline still has a
            // buffered fragment to account for.
            if let Some(line) = lines.flush() {
                if let Some(fragment) = parse_stream_line(&line) {
                    if let Some(delta) = fragment.response {
                        if !delta.is_empty() {
                            accumulated.push_str(&delta);
                            yield GenerateEvent::Chunk { delta };
                        }
                    }
                }
            }

            yield GenerateEvent::Done { text: accumulated };
        })
    }
}

/// Parse one stream line, returning None (with a warning) on malformed JSON.
fn parse_stream_line(line: &str) -> Option<StreamLine> {
    match serde_json::from_str(line) {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            tracing::warn!(%line, error = %e, "skipping unparseable stream line");
            None
        }
    }
}

/// Reassembles newline-delimited text from arbitrary byte chunks.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Feed bytes in; get every completed line out (without terminators).
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.trim_end_matches('\r');
            if !line.is_empty() {
                out.push(line.to_string());
            }
        }
        out
    }

    /// Drain any trailing partial line.
    fn flush(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buf).trim_end_matches('\r').to_string();
        self.buf.clear();
        (!line.is_empty()).then_some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_absent_system_field() {
        let request = GenerateRequest {
            model: "llama2:7b".into(),
            prompt: "hi".into(),
            stream: false,
            system: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_request_includes_system_field() {
        let request = GenerateRequest {
            model: "llama2:7b".into(),
            prompt: "hi".into(),
            stream: true,
            system: Some("be brief".into()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "be brief");
    }

    #[test]
    fn test_parse_stream_line_with_text() {
        let fragment = parse_stream_line(r#"{"response":"Hel","done":false}"#).unwrap();
        assert_eq!(fragment.response.as_deref(), Some("Hel"));
        assert!(!fragment.done);
    }

    #[test]
    fn test_parse_stream_line_final() {
        let fragment = parse_stream_line(r#"{"done":true}"#).unwrap();
        assert!(fragment.response.is_none());
        assert!(fragment.done);
    }

    #[test]
    fn test_parse_stream_line_malformed() {
        assert!(parse_stream_line("not json").is_none());
    }

    #[test]
    fn test_line_buffer_splits_across_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"respon").is_empty());
        let lines = buffer.push(b"se\":\"a\"}\n{\"response\":\"b\"}\n");
        assert_eq!(lines, vec![r#"{"response":"a"}"#, r#"{"response":"b"}"#]);
        assert!(buffer.flush().is_none());
    }

    #[test]
    fn test_line_buffer_flushes_trailing_fragment() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"done\":true}").is_empty());
        assert_eq!(buffer.flush().as_deref(), Some(r#"{"done":true}"#));
        assert!(buffer.flush().is_none());
    }

    #[test]
    fn test_line_buffer_handles_crlf() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"{\"a\":1}\r\n");
        assert_eq!(lines, vec![r#"{"a":1}"#]);
    }

    #[test]
    fn test_tags_deserialization() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"llama2:7b","size":123},{"name":"mistral:latest"}]}"#,
        )
        .unwrap();
        let names: Vec<_> = tags.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama2:7b", "mistral:latest"]);
    }

    #[test]
    fn test_tags_default_when_models_missing() {
        let tags: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(tags.models.is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_missing_response_field_fallback() {
        let body: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(body.response.is_none());
    }
}
