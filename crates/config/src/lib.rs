//! Configuration loading, validation, and management for banter.
//!
//! Loads configuration from `~/.banter/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.banter/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Model backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Conversation session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Message log storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Web server configuration
    #[serde(default)]
    pub web: WebConfig,

    /// Voice pipeline configuration
    #[serde(default)]
    pub voice: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the model server
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Model to converse with
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "gemma3:1b-it-qat".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl BackendConfig {
    /// The per-call timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            model: default_model(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fixed instruction prepended to every prompt. Set to an empty
    /// string in the config file to disable it.
    #[serde(default = "default_system_directive")]
    pub system_directive: String,

    /// Whether replies are streamed token-by-token
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Cap on how many history messages are sent to the model per turn.
    /// The full history is always kept in the log; 0 means no cap.
    #[serde(default)]
    pub history_limit: usize,
}

fn default_system_directive() -> String {
    "You're a helpful, friendly AI assistant. \
     Keep responses conversational, human-like, and relevant to the context. \
     Use emojis if appropriate!"
        .into()
}
fn default_true() -> bool {
    true
}

impl SessionConfig {
    /// The directive as an option: `None` when configured empty.
    pub fn directive(&self) -> Option<&str> {
        let trimmed = self.system_directive.trim();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    }

    /// The history cap as an option: `None` when set to 0.
    pub fn history_cap(&self) -> Option<usize> {
        if self.history_limit == 0 {
            None
        } else {
            Some(self.history_limit)
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_directive: default_system_directive(),
            streaming: true,
            history_limit: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which message log backend to use: "sqlite" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Path to the SQLite database file. Relative paths resolve against
    /// the workspace directory.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

fn default_storage_backend() -> String {
    "sqlite".into()
}
fn default_sqlite_path() -> String {
    "chat_history.db".into()
}

impl StorageConfig {
    /// Resolve the SQLite path: absolute paths are used as-is, relative
    /// ones land in the workspace directory.
    pub fn resolved_sqlite_path(&self) -> PathBuf {
        let path = Path::new(&self.sqlite_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            AppConfig::workspace_dir().join(path)
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8643
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Base URL of the speech server (OpenAI-compatible audio endpoints)
    #[serde(default = "default_speech_url")]
    pub speech_base_url: String,

    /// API key for the speech server, if it requires one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Transcription model
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    /// Synthesis model
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Synthesis voice
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,

    /// Flush the sentence buffer to the speaker once it exceeds this many
    /// characters (sentence-ending punctuation flushes immediately)
    #[serde(default = "default_flush_chars")]
    pub flush_chars: usize,
}

fn default_speech_url() -> String {
    "http://localhost:8000".into()
}
fn default_stt_model() -> String {
    "whisper-1".into()
}
fn default_tts_model() -> String {
    "tts-1".into()
}
fn default_tts_voice() -> String {
    "alloy".into()
}
fn default_flush_chars() -> usize {
    20
}

impl std::fmt::Debug for VoiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceConfig")
            .field("speech_base_url", &self.speech_base_url)
            .field("api_key", &redact(&self.api_key))
            .field("stt_model", &self.stt_model)
            .field("tts_model", &self.tts_model)
            .field("tts_voice", &self.tts_voice)
            .field("flush_chars", &self.flush_chars)
            .finish()
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speech_base_url: default_speech_url(),
            api_key: None,
            stt_model: default_stt_model(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
            flush_chars: default_flush_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.banter/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `BANTER_BACKEND_URL` — model server base URL
    /// - `BANTER_MODEL` — model name
    /// - `BANTER_STORAGE` — "sqlite" or "memory"
    /// - `BANTER_SPEECH_API_KEY` — speech server API key
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(url) = std::env::var("BANTER_BACKEND_URL") {
            config.backend.base_url = url;
        }
        if let Ok(model) = std::env::var("BANTER_MODEL") {
            config.backend.model = model;
        }
        if let Ok(storage) = std::env::var("BANTER_STORAGE") {
            config.storage.backend = storage;
        }
        if config.voice.api_key.is_none() {
            config.voice.api_key = std::env::var("BANTER_SPEECH_API_KEY").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".banter")
    }

    /// Get the workspace directory path (databases, recordings).
    pub fn workspace_dir() -> PathBuf {
        Self::config_dir().join("workspace")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                self.backend.base_url
            )));
        }

        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.model must not be empty".into(),
            ));
        }

        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend.request_timeout_secs must be > 0".into(),
            ));
        }

        match self.storage.backend.as_str() {
            "sqlite" | "memory" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "storage.backend must be 'sqlite' or 'memory', got '{other}'"
                )));
            }
        }

        if self.voice.flush_chars == 0 {
            return Err(ConfigError::ValidationError(
                "voice.flush_chars must be > 0".into(),
            ));
        }

        Ok(())
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for banter_core::Error {
    fn from(err: ConfigError) -> Self {
        banter_core::Error::Config {
            message: err.to_string(),
        }
    }
}
