//! Command implementations, plus the shared wiring that builds the
//! engine stack from configuration.

pub mod chat;
pub mod history;
pub mod serve;
pub mod voice;

use banter_backends::OllamaGateway;
use banter_config::AppConfig;
use banter_core::error::{Error, Result};
use banter_core::log::MessageLog;
use banter_engine::{SessionEngine, SessionOptions};
use banter_store::{InMemoryLog, SqliteLog};
use std::sync::Arc;
use tracing::debug;

/// Build the message log selected by configuration.
pub(crate) async fn build_log(config: &AppConfig) -> Result<Arc<dyn MessageLog>> {
    match config.storage.backend.as_str() {
        "memory" => {
            debug!("Using in-memory message log");
            Ok(Arc::new(InMemoryLog::new()))
        }
        _ => {
            let path = config.storage.resolved_sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Internal(format!("Cannot create {}: {e}", parent.display()))
                })?;
            }
            let url = format!("sqlite://{}", path.display());
            debug!(path = %path.display(), "Using SQLite message log");
            Ok(Arc::new(SqliteLog::new(&url).await?))
        }
    }
}

/// Build the session engine from configuration.
pub(crate) async fn build_engine(config: &AppConfig) -> Result<Arc<SessionEngine>> {
    let log = build_log(config).await?;
    let gateway = Arc::new(OllamaGateway::new(config.backend.base_url.clone()));

    let mut options = SessionOptions::new(config.backend.model.clone())
        .with_request_timeout(config.backend.request_timeout());
    if let Some(directive) = config.session.directive() {
        options = options.with_system_directive(directive);
    }
    if let Some(limit) = config.session.history_cap() {
        options = options.with_history_limit(limit);
    }

    Ok(Arc::new(SessionEngine::new(log, gateway, options)))
}

/// Fail fast with a clear diagnostic when the backend is unreachable,
/// instead of proceeding into an unusable loop.
pub(crate) async fn ensure_backend(engine: &SessionEngine, base_url: &str) -> Result<()> {
    match engine.health_check().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::Internal(format!(
            "Model backend at {base_url} answered but reports unhealthy"
        ))),
        Err(e) => Err(Error::Internal(format!(
            "Cannot reach model backend at {base_url}: {e} — is the model server running?"
        ))),
    }
}
