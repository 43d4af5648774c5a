//! Error types for the banter domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all banter operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model gateway errors ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Message log errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Voice input errors ---
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Backend returned an error: {message} (status: {status_code})")]
    Backend { status_code: u16, message: String },

    /// The backend dropped the connection mid-stream. Fragments that already
    /// arrived are kept in `partial` so the caller can decide what to do
    /// with them; nothing is written to the message log.
    #[error("Stream interrupted after {} bytes of partial reply: {reason}", .partial.len())]
    StreamInterrupted { partial: String, reason: String },

    /// The caller cancelled a streaming turn between fragments.
    #[error("Turn cancelled after {} bytes of partial reply", .partial.len())]
    Cancelled { partial: String },

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),
}

/// Errors at the speech boundary. Unintelligible audio and a failing
/// transcription service are distinct conditions; callers may still choose
/// to handle both the same way.
#[derive(Debug, Clone, Error)]
pub enum InputError {
    #[error("Could not understand audio")]
    Unintelligible,

    #[error("Speech service failure: {0}")]
    ServiceFailure(String),
}
