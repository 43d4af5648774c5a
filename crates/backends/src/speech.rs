//! Speech service clients — OpenAI-compatible audio endpoints.
//!
//! A local speech server (whisper.cpp server, faster-whisper, kokoro and
//! friends) exposes `POST /v1/audio/transcriptions` for speech-to-text and
//! `POST /v1/audio/speech` for synthesis. These clients speak that shape.

use async_trait::async_trait;
use banter_core::error::InputError;
use banter_core::speech::{SpeechToText, TextToSpeech};
use tracing::debug;

/// Shared configuration for both speech clients.
#[derive(Clone)]
pub struct SpeechClientConfig {
    /// Base URL of the speech server (e.g., "http://localhost:8000")
    pub base_url: String,

    /// API key, if the server requires one
    pub api_key: Option<String>,

    /// Transcription model
    pub stt_model: String,

    /// Synthesis model
    pub tts_model: String,

    /// Synthesis voice
    pub tts_voice: String,
}

impl std::fmt::Debug for SpeechClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("stt_model", &self.stt_model)
            .field("tts_model", &self.tts_model)
            .field("tts_voice", &self.tts_voice)
            .finish()
    }
}

impl SpeechClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            stt_model: "whisper-1".into(),
            tts_model: "tts-1".into(),
            tts_voice: "alloy".into(),
        }
    }
}

/// Guess the MIME type from an audio filename extension.
fn audio_mime(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        _ => "audio/wav",
    }
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(300))
        .build()
        .expect("Failed to create HTTP client")
}

/// Speech-to-text over `POST /v1/audio/transcriptions`.
pub struct HttpSpeechToText {
    config: SpeechClientConfig,
    client: reqwest::Client,
}

impl HttpSpeechToText {
    pub fn new(config: SpeechClientConfig) -> Self {
        Self {
            config,
            client: build_client(),
        }
    }
}

#[async_trait]
impl SpeechToText for HttpSpeechToText {
    fn name(&self) -> &str {
        "speech-http"
    }

    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, InputError> {
        let url = format!("{}/v1/audio/transcriptions", self.config.base_url);

        debug!(
            model = %self.config.stt_model,
            size = audio.len(),
            "Transcription request"
        );

        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(audio_mime(filename))
            .map_err(|e| InputError::ServiceFailure(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.config.stt_model.clone());

        let mut request = self.client.post(&url).multipart(form);
        if let Some(ref key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| InputError::ServiceFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InputError::ServiceFailure(format!("HTTP {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InputError::ServiceFailure(e.to_string()))?;

        let text = json["text"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        // The service answered but heard nothing usable.
        if text.is_empty() {
            return Err(InputError::Unintelligible);
        }

        Ok(text)
    }
}

/// Text-to-speech over `POST /v1/audio/speech`.
pub struct HttpTextToSpeech {
    config: SpeechClientConfig,
    client: reqwest::Client,
}

impl HttpTextToSpeech {
    pub fn new(config: SpeechClientConfig) -> Self {
        Self {
            config,
            client: build_client(),
        }
    }
}

#[async_trait]
impl TextToSpeech for HttpTextToSpeech {
    fn name(&self) -> &str {
        "speech-http"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, InputError> {
        let url = format!("{}/v1/audio/speech", self.config.base_url);

        let body = serde_json::json!({
            "model": self.config.tts_model,
            "voice": self.config.tts_voice,
            "input": text,
        });

        debug!(model = %self.config.tts_model, chars = text.len(), "Synthesis request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| InputError::ServiceFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InputError::ServiceFailure(format!("HTTP {status}: {text}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| InputError::ServiceFailure(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_trims_trailing_slash() {
        let config = SpeechClientConfig::new("http://localhost:8000/");
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn api_key_redacted_in_debug() {
        let mut config = SpeechClientConfig::new("http://localhost:8000");
        config.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn mime_guess_from_extension() {
        assert_eq!(audio_mime("clip.wav"), "audio/wav");
        assert_eq!(audio_mime("clip.mp3"), "audio/mpeg");
        assert_eq!(audio_mime("clip.webm"), "audio/webm");
        assert_eq!(audio_mime("noextension"), "audio/wav");
    }

    #[test]
    fn synthesis_body_shape() {
        let config = SpeechClientConfig::new("http://localhost:8000");
        let body = serde_json::json!({
            "model": config.tts_model,
            "voice": config.tts_voice,
            "input": "Hello!",
        });
        let text = body.to_string();
        assert!(text.contains("\"voice\":\"alloy\""));
        assert!(text.contains("\"input\":\"Hello!\""));
    }
}
