//! `banter history <conversation-id>` — print a stored transcript.

use banter_config::AppConfig;
use banter_core::message::ConversationId;

pub async fn run(conversation_id: &str) -> banter_core::Result<()> {
    let config = AppConfig::load()?;
    let log = super::build_log(&config).await?;

    let id = ConversationId::from(conversation_id);
    let history = log.load(&id).await?;

    if history.is_empty() {
        println!("No messages for conversation {id}.");
        return Ok(());
    }

    for message in &history {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%Y-%m-%d %H:%M:%S"),
            message.role.as_str(),
            message.content
        );
    }
    println!("\n{} messages.", history.len());

    Ok(())
}
