//! The conversation session engine.
//!
//! One turn is one sequential unit of work: load the history, record the
//! inbound message, assemble the prompt, invoke the model, accumulate the
//! reply, record it, return the updated state. The user message is
//! appended *before* the model call, so a failed or crashed turn still
//! leaves the user's utterance in the log.
//!
//! Turns against the same conversation are serialized by a per-id gate;
//! independent conversations proceed concurrently.

use banter_core::error::{GatewayError, Result};
use banter_core::gateway::{ChatRequest, ModelGateway};
use banter_core::log::MessageLog;
use banter_core::message::{ConversationId, Message};
use banter_core::prompt::PromptAssembler;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Tunables for a session engine instance.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Model to converse with
    pub model: String,

    /// Fixed instruction prepended to every prompt
    pub system_directive: Option<String>,

    /// Cap on how many history messages reach the prompt per turn.
    /// The log always keeps everything; `None` means no cap.
    pub history_limit: Option<usize>,

    /// Timeout applied to each gateway call, and to the wait for each
    /// fragment of a streamed reply
    pub request_timeout: Duration,
}

impl SessionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_directive: None,
            history_limit: None,
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_system_directive(mut self, directive: impl Into<String>) -> Self {
        self.system_directive = Some(directive.into());
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// The result of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant message produced by this turn
    pub reply: Message,

    /// The conversation history including this turn, in order
    pub history: Vec<Message>,
}

/// Orchestrates conversation turns against a message log and a model
/// gateway. Both collaborators are injected, so tests can substitute
/// doubles for either.
pub struct SessionEngine {
    log: Arc<dyn MessageLog>,
    gateway: Arc<dyn ModelGateway>,
    options: SessionOptions,
    /// Per-conversation gates: at most one in-flight turn per id.
    gates: StdMutex<HashMap<ConversationId, Arc<AsyncMutex<()>>>>,
}

impl SessionEngine {
    pub fn new(
        log: Arc<dyn MessageLog>,
        gateway: Arc<dyn ModelGateway>,
        options: SessionOptions,
    ) -> Self {
        Self {
            log,
            gateway,
            options,
            gates: StdMutex::new(HashMap::new()),
        }
    }

    /// The gate serializing turns for one conversation.
    fn gate(&self, conversation_id: &ConversationId) -> Arc<AsyncMutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Read-only snapshot of a conversation's history.
    pub async fn history(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        Ok(self.log.load(conversation_id).await?)
    }

    /// Can we reach the model backend?
    pub async fn health_check(&self) -> std::result::Result<bool, GatewayError> {
        self.gateway.health_check().await
    }

    /// Run one whole-response turn.
    pub async fn turn(
        &self,
        conversation_id: &ConversationId,
        inbound_text: &str,
    ) -> Result<TurnOutcome> {
        let gate = self.gate(conversation_id);
        let _in_flight = gate.lock().await;

        let (mut history, request) = self.record_and_assemble(conversation_id, inbound_text, false).await?;

        let timeout = self.options.request_timeout;
        let reply = tokio::time::timeout(timeout, self.gateway.complete(request))
            .await
            .map_err(|_| GatewayError::Timeout {
                seconds: timeout.as_secs(),
            })??;

        self.merge_reply(conversation_id, reply.content, &mut history)
            .await
    }

    /// Run one streaming turn. Each fragment is forwarded to `sink` and
    /// appended to the accumulator, in arrival order, before the next
    /// fragment is taken.
    pub async fn turn_streaming<F>(
        &self,
        conversation_id: &ConversationId,
        inbound_text: &str,
        sink: F,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&str) + Send,
    {
        self.turn_streaming_with_cancel(conversation_id, inbound_text, sink, CancellationToken::new())
            .await
    }

    /// Streaming turn with a cancellation token, checked between
    /// fragments. Cancelling aborts the turn without appending an
    /// assistant message; the user message stays recorded.
    pub async fn turn_streaming_with_cancel<F>(
        &self,
        conversation_id: &ConversationId,
        inbound_text: &str,
        mut sink: F,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&str) + Send,
    {
        let gate = self.gate(conversation_id);
        let _in_flight = gate.lock().await;

        let (mut history, request) = self.record_and_assemble(conversation_id, inbound_text, true).await?;

        let timeout = self.options.request_timeout;
        let mut rx = tokio::time::timeout(timeout, self.gateway.stream(request))
            .await
            .map_err(|_| GatewayError::Timeout {
                seconds: timeout.as_secs(),
            })??;

        let mut accumulator = String::new();
        loop {
            if cancel.is_cancelled() {
                warn!(conversation = %conversation_id, "Turn cancelled mid-stream");
                return Err(GatewayError::Cancelled {
                    partial: accumulator,
                }
                .into());
            }

            let next = tokio::time::timeout(timeout, rx.recv())
                .await
                .map_err(|_| GatewayError::Timeout {
                    seconds: timeout.as_secs(),
                })?;

            match next {
                None => break,
                Some(Ok(chunk)) => {
                    if !chunk.content.is_empty() {
                        sink(&chunk.content);
                        accumulator.push_str(&chunk.content);
                    }
                    if chunk.done {
                        break;
                    }
                }
                Some(Err(e)) => {
                    return Err(GatewayError::StreamInterrupted {
                        partial: accumulator,
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        }

        self.merge_reply(conversation_id, accumulator, &mut history)
            .await
    }

    /// Steps 1–2 of a turn: record the inbound message, then assemble
    /// the prompt and request from the updated history.
    async fn record_and_assemble(
        &self,
        conversation_id: &ConversationId,
        inbound_text: &str,
        stream: bool,
    ) -> Result<(Vec<Message>, ChatRequest)> {
        let mut history = self.log.load(conversation_id).await?;

        let user_message = Message::user(inbound_text);
        self.log.append(conversation_id, user_message.clone()).await?;
        history.push(user_message);

        let window = match self.options.history_limit {
            Some(limit) if history.len() > limit => &history[history.len() - limit..],
            _ => &history[..],
        };
        let prompt = PromptAssembler::build(window, self.options.system_directive.as_deref());

        debug!(
            conversation = %conversation_id,
            prompt_len = prompt.len(),
            stream,
            "Turn assembled"
        );

        let request = ChatRequest {
            model: self.options.model.clone(),
            messages: prompt,
            stream,
        };
        Ok((history, request))
    }

    /// Step 4 of a turn: record the reply and hand back the updated state.
    async fn merge_reply(
        &self,
        conversation_id: &ConversationId,
        content: String,
        history: &mut Vec<Message>,
    ) -> Result<TurnOutcome> {
        let reply = Message::assistant(content);
        self.log.append(conversation_id, reply.clone()).await?;
        history.push(reply.clone());

        debug!(
            conversation = %conversation_id,
            reply_chars = reply.content.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            reply,
            history: std::mem::take(history),
        })
    }
}
