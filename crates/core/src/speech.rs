//! Speech traits — the boundary to transcription and synthesis services.
//!
//! Both traits work at the audio-bytes level; capturing from a microphone
//! and playing through a speaker are device concerns that live with the
//! voice adapter, not here.

use crate::error::InputError;
use async_trait::async_trait;

/// Speech-to-text: turn a recorded utterance into text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// The service name (e.g., "whisper-http").
    fn name(&self) -> &str;

    /// Transcribe recorded audio to text.
    ///
    /// `filename` hints the container format for services that need it
    /// (e.g., "clip.wav"). Fails with [`InputError::Unintelligible`] when
    /// the service produced no usable transcript, and
    /// [`InputError::ServiceFailure`] when the service itself failed.
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
    ) -> std::result::Result<String, InputError>;
}

/// Text-to-speech: turn a reply fragment into playable audio.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// The service name (e.g., "speech-http").
    fn name(&self) -> &str;

    /// Synthesize audio for the given text.
    async fn synthesize(&self, text: &str) -> std::result::Result<Vec<u8>, InputError>;
}
