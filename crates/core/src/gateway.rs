//! ModelGateway trait — the abstraction over the inference backend.
//!
//! A gateway knows how to send an assembled prompt context to a model
//! server and get a reply back, either as a complete message or as a
//! stream of fragments.
//!
//! Implementations: native Ollama API, test stubs.

use crate::error::GatewayError;
use crate::prompt::PromptMessage;
use async_trait::async_trait;
use serde::Serialize;

/// A request to the inference backend.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "gemma3:1b-it-qat")
    pub model: String,

    /// The assembled prompt context, in order
    pub messages: Vec<PromptMessage>,

    /// Whether the reply should be streamed
    pub stream: bool,
}

/// A complete (non-streaming) reply from the backend.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// The full reply text
    pub content: String,

    /// Which model actually responded
    pub model: String,
}

/// One incremental fragment of a streamed reply.
#[derive(Debug, Clone)]
pub struct ReplyChunk {
    /// Partial content delta
    pub content: String,

    /// Whether this is the final chunk
    pub done: bool,
}

/// The core ModelGateway trait.
///
/// The session engine calls `complete()` or `stream()` without knowing
/// which backend is being used. Constructed explicitly and passed in,
/// so tests can substitute doubles.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// A human-readable name for this gateway (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a request and block until the full reply is available.
    async fn complete(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<ChatReply, GatewayError>;

    /// Send a request and get a stream of reply fragments, delivered in
    /// arrival order and terminated by a chunk with `done == true`.
    ///
    /// Default implementation calls `complete()` and wraps the result as
    /// a single final chunk.
    async fn stream(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<ReplyChunk, GatewayError>>,
        GatewayError,
    > {
        let reply = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(ReplyChunk {
                content: reply.content,
                done: true,
            }))
            .await;
        Ok(rx)
    }

    /// List model names available on the backend.
    async fn list_models(&self) -> std::result::Result<Vec<String>, GatewayError> {
        Ok(Vec::new())
    }

    /// Health check — can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, GatewayError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubGateway;

    #[async_trait]
    impl ModelGateway for StubGateway {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _request: ChatRequest,
        ) -> std::result::Result<ChatReply, GatewayError> {
            Ok(ChatReply {
                content: "whole reply".into(),
                model: "stub-model".into(),
            })
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let gw = StubGateway;
        let request = ChatRequest {
            model: "stub-model".into(),
            messages: vec![],
            stream: true,
        };

        let mut rx = gw.stream(request).await.unwrap();
        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk.content, "whole reply");
        assert!(chunk.done);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn chat_request_serializes_roles() {
        let request = ChatRequest {
            model: "m".into(),
            messages: vec![PromptMessage {
                role: "user",
                content: "hi".into(),
            }],
            stream: false,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"stream\":false"));
    }
}
