//! Web front-end for banter.
//!
//! Serves an embedded chat widget and a small JSON API over Axum:
//! - `POST /chat` — one whole-response turn
//! - `POST /chat/stream` — one turn streamed as server-sent events
//! - `GET /conversations/{id}` — ordered history snapshot
//! - `GET /health` — liveness
//!
//! Startup checks that the model backend is reachable and fails fast
//! with a clear diagnostic when it isn't.

pub mod frontend;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use banter_core::error::{Error, GatewayError};
use banter_core::message::{ConversationId, Message};
use banter_engine::SessionEngine;
use futures::Stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info};

/// Shared application state for the web server.
pub struct WebState {
    pub engine: Arc<SessionEngine>,
}

type SharedState = Arc<WebState>;

/// Build the Axum router with all routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/conversations/{id}", get(conversation_handler))
        .with_state(state)
        .merge(frontend::frontend_router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the web server.
pub async fn serve(host: &str, port: u16, engine: Arc<SessionEngine>) -> banter_core::Result<()> {
    match engine.health_check().await {
        Ok(true) => {}
        Ok(false) => {
            error!("Model backend answered but reports unhealthy");
            return Err(GatewayError::Network("model backend is not healthy".into()).into());
        }
        Err(e) => {
            error!(error = %e, "Model backend unreachable — is the model server running?");
            return Err(e.into());
        }
    }

    let app = build_router(Arc::new(WebState { engine }));
    let addr = format!("{host}:{port}");

    info!(addr = %addr, "Web chat starting");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct ChatApiRequest {
    /// Omit to start a fresh conversation.
    #[serde(default)]
    conversation_id: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct ChatApiResponse {
    conversation_id: String,
    reply: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: &Error) -> (StatusCode, Json<ErrorBody>) {
    let status = match err {
        Error::Gateway(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

fn resolve_conversation(requested: Option<String>) -> ConversationId {
    match requested {
        Some(id) if !id.trim().is_empty() => ConversationId(id),
        _ => ConversationId::new(),
    }
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatApiRequest>,
) -> Result<Json<ChatApiResponse>, (StatusCode, Json<ErrorBody>)> {
    let conversation_id = resolve_conversation(payload.conversation_id);

    let outcome = state
        .engine
        .turn(&conversation_id, &payload.message)
        .await
        .map_err(|e| error_response(&e))?;

    Ok(Json(ChatApiResponse {
        conversation_id: conversation_id.to_string(),
        reply: outcome.reply.content,
    }))
}

/// Streamed turn: `token` events carry reply fragments, one `done` event
/// carrying the conversation id closes a successful turn, and an `error`
/// event reports a failed one. Fragments already delivered stay delivered
/// either way.
async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatApiRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let conversation_id = resolve_conversation(payload.conversation_id);
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let engine = state.engine.clone();
    let id = conversation_id.clone();
    tokio::spawn(async move {
        let fragment_tx = tx.clone();
        let result = engine
            .turn_streaming(&id, &payload.message, move |fragment| {
                let _ = fragment_tx.send(Event::default().event("token").data(fragment));
            })
            .await;

        match result {
            Ok(_) => {
                let _ = tx.send(Event::default().event("done").data(id.to_string()));
            }
            Err(e) => {
                error!(conversation = %id, error = %e, "Streaming turn failed");
                let _ = tx.send(Event::default().event("error").data(e.to_string()));
            }
        }
    });

    Sse::new(UnboundedReceiverStream::new(rx).map(Ok)).keep_alive(KeepAlive::default())
}

async fn conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, (StatusCode, Json<ErrorBody>)> {
    let history = state
        .engine
        .history(&ConversationId(id))
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(history))
}
