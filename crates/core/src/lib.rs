//! # Banter Core
//!
//! Domain types, traits, and error definitions for the banter conversation
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod gateway;
pub mod log;
pub mod message;
pub mod prompt;
pub mod speech;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GatewayError, InputError, Result, StorageError};
pub use gateway::{ChatReply, ChatRequest, ModelGateway, ReplyChunk};
pub use log::MessageLog;
pub use message::{ConversationId, Message, Role};
pub use prompt::{PromptAssembler, PromptMessage};
pub use speech::{SpeechToText, TextToSpeech};
