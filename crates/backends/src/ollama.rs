//! Native Ollama gateway implementation.
//!
//! Talks to an Ollama server's `/api/chat` endpoint in both whole-response
//! and streaming mode. Streaming replies arrive as NDJSON: one JSON object
//! per line, terminated by a line with `"done": true`.
//!
//! `/api/tags` doubles as the health check and model listing.

use async_trait::async_trait;
use banter_core::error::GatewayError;
use banter_core::gateway::{ChatReply, ChatRequest, ModelGateway, ReplyChunk};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, trace, warn};

/// A gateway to a local Ollama server.
pub struct OllamaGateway {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaGateway {
    /// Create a new gateway for the given base URL
    /// (e.g., "http://localhost:11434").
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Map a non-success HTTP status onto a gateway error. Ollama answers
    /// 404 with a "model not found" body when the model isn't pulled.
    fn status_error(status: u16, body: String, model: &str) -> GatewayError {
        if status == 404 {
            GatewayError::ModelNotFound(model.to_string())
        } else {
            GatewayError::Backend {
                status_code: status,
                message: body,
            }
        }
    }
}

#[async_trait]
impl ModelGateway for OllamaGateway {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, GatewayError> {
        let url = format!("{}/api/chat", self.base_url);
        let model = request.model.clone();

        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": false,
        });

        debug!(model = %model, messages = request.messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(Self::status_error(status, error_body, &model));
        }

        let api_response: ApiChatResponse = response.json().await.map_err(|e| {
            GatewayError::Backend {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            }
        })?;

        Ok(ChatReply {
            content: api_response.message.content,
            model: api_response.model,
        })
    }

    async fn stream(
        &self,
        request: ChatRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<ReplyChunk, GatewayError>>,
        GatewayError,
    > {
        let url = format!("{}/api/chat", self.base_url);
        let model = request.model.clone();

        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": true,
        });

        debug!(model = %model, messages = request.messages.len(), "Sending streaming chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend streaming error");
            return Err(Self::status_error(status, error_body, &model));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the NDJSON byte stream line by line and forward chunks.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(GatewayError::Network(e.to_string()))).await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<ApiStreamLine>(&line) {
                        Ok(parsed) => {
                            // Ollama reports mid-stream failures as an
                            // error field on a line of its own.
                            if let Some(message) = parsed.error {
                                let _ = tx.send(Err(GatewayError::Backend {
                                    status_code: 200,
                                    message,
                                })).await;
                                return;
                            }

                            let content = parsed
                                .message
                                .map(|m| m.content)
                                .unwrap_or_default();

                            if !content.is_empty() || parsed.done {
                                let chunk = ReplyChunk {
                                    content,
                                    done: parsed.done,
                                };
                                let is_done = parsed.done;
                                if tx.send(Ok(chunk)).await.is_err() {
                                    return; // receiver dropped
                                }
                                if is_done {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            trace!(line = %line, error = %e, "Ignoring unparseable stream line");
                        }
                    }
                }
            }

            // Stream ended without a done line — the connection dropped.
            let _ = tx
                .send(Err(GatewayError::Network(
                    "stream ended before completion".into(),
                )))
                .await;
        });

        Ok(rx)
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: ApiTagsResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(body.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> Result<bool, GatewayError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    model: String,
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: String,
}

/// One NDJSON line of a streaming response.
#[derive(Debug, Deserialize)]
struct ApiStreamLine {
    #[serde(default)]
    message: Option<ApiMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTagsResponse {
    #[serde(default)]
    models: Vec<ApiTag>,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_core::prompt::PromptMessage;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gw = OllamaGateway::new("http://localhost:11434/");
        assert_eq!(gw.base_url, "http://localhost:11434");
        assert_eq!(gw.name(), "ollama");
    }

    #[test]
    fn not_found_maps_to_model_not_found() {
        let err = OllamaGateway::status_error(404, "model 'nope' not found".into(), "nope");
        assert!(matches!(err, GatewayError::ModelNotFound(m) if m == "nope"));
    }

    #[test]
    fn other_statuses_map_to_backend_error() {
        let err = OllamaGateway::status_error(500, "loading failed".into(), "m");
        assert!(matches!(
            err,
            GatewayError::Backend { status_code: 500, .. }
        ));
    }

    #[test]
    fn parse_whole_response() {
        let data = r#"{
            "model": "gemma3:1b-it-qat",
            "created_at": "2025-05-04T10:20:30Z",
            "message": {"role": "assistant", "content": "hi there"},
            "done": true
        }"#;
        let parsed: ApiChatResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.model, "gemma3:1b-it-qat");
        assert_eq!(parsed.message.content, "hi there");
    }

    #[test]
    fn parse_stream_content_line() {
        let data = r#"{"model":"m","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        let parsed: ApiStreamLine = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.message.unwrap().content, "Hel");
        assert!(!parsed.done);
        assert!(parsed.error.is_none());
    }

    #[test]
    fn parse_stream_done_line() {
        let data = r#"{"model":"m","message":{"role":"assistant","content":""},"done":true,"total_duration":12345}"#;
        let parsed: ApiStreamLine = serde_json::from_str(data).unwrap();
        assert!(parsed.done);
    }

    #[test]
    fn parse_stream_error_line() {
        let data = r#"{"error":"model runner has unexpectedly stopped"}"#;
        let parsed: ApiStreamLine = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.error.as_deref(),
            Some("model runner has unexpectedly stopped")
        );
    }

    #[test]
    fn parse_tags_response() {
        let data = r#"{"models":[{"name":"gemma3:1b-it-qat","size":1000},{"name":"llama3.2:3b"}]}"#;
        let parsed: ApiTagsResponse = serde_json::from_str(data).unwrap();
        let names: Vec<&str> = parsed.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["gemma3:1b-it-qat", "llama3.2:3b"]);
    }

    #[test]
    fn request_body_shape() {
        let request = ChatRequest {
            model: "gemma3:1b-it-qat".into(),
            messages: vec![
                PromptMessage {
                    role: "system",
                    content: "Be friendly.".into(),
                },
                PromptMessage {
                    role: "user",
                    content: "hello".into(),
                },
            ],
            stream: false,
        };
        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": false,
        });
        let text = body.to_string();
        assert!(text.contains("\"role\":\"system\""));
        assert!(text.contains("\"content\":\"hello\""));
        assert!(text.contains("\"stream\":false"));
    }
}
