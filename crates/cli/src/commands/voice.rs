//! `banter voice` — spoken conversation.
//!
//! Wires the voice loop to HTTP speech services and a file-based audio
//! device: recordings come from WAV files the user points at, and reply
//! audio lands as WAV files in the workspace directory. Swapping in a
//! real capture/playback device means implementing `AudioDevice`.

use async_trait::async_trait;
use banter_backends::{HttpSpeechToText, HttpTextToSpeech, SpeechClientConfig};
use banter_channels::{AudioDevice, VoiceLoop};
use banter_config::AppConfig;
use banter_core::error::InputError;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// File-based audio device: prompts for a recorded clip's path and
/// writes reply audio next to the workspace database.
struct WavFileDevice {
    out_dir: PathBuf,
    counter: AtomicU64,
}

impl WavFileDevice {
    fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl AudioDevice for WavFileDevice {
    async fn record(&self) -> Result<Vec<u8>, InputError> {
        print!("Path to a recorded clip (wav): ");
        let _ = std::io::stdout().flush();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let path = match lines.next_line().await {
            Ok(Some(line)) => line.trim().to_string(),
            _ => String::new(),
        };

        if path.is_empty() {
            return Err(InputError::Unintelligible);
        }

        tokio::fs::read(&path)
            .await
            .map_err(|e| InputError::ServiceFailure(format!("Cannot read {path}: {e}")))
    }

    async fn play(&self, audio: &[u8]) -> Result<(), InputError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = self.out_dir.join(format!("reply-{n:04}.wav"));

        tokio::fs::write(&path, audio)
            .await
            .map_err(|e| InputError::ServiceFailure(format!("Cannot write {}: {e}", path.display())))?;

        info!(path = %path.display(), "Reply audio written");
        Ok(())
    }
}

pub async fn run() -> banter_core::Result<()> {
    let config = AppConfig::load()?;
    let engine = super::build_engine(&config).await?;
    super::ensure_backend(&engine, &config.backend.base_url).await?;

    let mut speech_config = SpeechClientConfig::new(config.voice.speech_base_url.clone());
    speech_config.api_key = config.voice.api_key.clone();
    speech_config.stt_model = config.voice.stt_model.clone();
    speech_config.tts_model = config.voice.tts_model.clone();
    speech_config.tts_voice = config.voice.tts_voice.clone();

    let out_dir = AppConfig::workspace_dir().join("replies");
    std::fs::create_dir_all(&out_dir).map_err(|e| {
        banter_core::Error::Internal(format!("Cannot create {}: {e}", out_dir.display()))
    })?;

    let voice = VoiceLoop::new(
        engine,
        Arc::new(HttpSpeechToText::new(speech_config.clone())),
        Arc::new(HttpTextToSpeech::new(speech_config)),
        Arc::new(WavFileDevice::new(out_dir)),
    )
    .with_flush_chars(config.voice.flush_chars);

    voice.run().await
}
