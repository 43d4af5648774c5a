//! `banter chat` — interactive console conversation.

use banter_channels::ConsoleLoop;
use banter_config::AppConfig;
use banter_core::message::ConversationId;

pub async fn run(conversation: Option<String>, no_stream: bool) -> banter_core::Result<()> {
    let config = AppConfig::load()?;
    let engine = super::build_engine(&config).await?;
    super::ensure_backend(&engine, &config.backend.base_url).await?;

    let mut console =
        ConsoleLoop::new(engine).with_streaming(config.session.streaming && !no_stream);
    if let Some(id) = conversation {
        console = console.with_conversation(ConversationId::from(&id));
    }

    console.run().await
}
