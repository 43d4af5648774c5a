//! Service clients for banter's external collaborators.
//!
//! - [`ollama`] — the model gateway speaking the native Ollama HTTP API
//! - [`speech`] — speech-to-text and text-to-speech over OpenAI-compatible
//!   audio endpoints, the way a local speech server exposes them

pub mod ollama;
pub mod speech;

pub use ollama::OllamaGateway;
pub use speech::{HttpSpeechToText, HttpTextToSpeech, SpeechClientConfig};
