//! Front-end adapters that drive the session engine.
//!
//! Each adapter owns its transport (terminal, microphone/speaker) and its
//! user-visible error messaging. None of them touch the message log on
//! failure — the engine's step ordering already decided what is recorded.

pub mod console;
pub mod voice;

pub use console::ConsoleLoop;
pub use voice::{AudioDevice, SentenceBuffer, SpeechJob, VoiceLoop};
