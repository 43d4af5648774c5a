//! Console adapter — interactive terminal chat.
//!
//! The simplest front-end: reads from stdin, writes to stdout. Streams
//! reply tokens as they arrive when streaming is on.

use banter_core::message::ConversationId;
use banter_engine::SessionEngine;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::debug;

/// Words that end the conversation loop.
fn is_exit_word(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "byee")
}

/// Interactive console chat loop.
pub struct ConsoleLoop {
    engine: Arc<SessionEngine>,
    conversation_id: ConversationId,
    streaming: bool,
}

impl ConsoleLoop {
    pub fn new(engine: Arc<SessionEngine>) -> Self {
        Self {
            engine,
            conversation_id: ConversationId::new(),
            streaming: true,
        }
    }

    /// Resume an existing conversation instead of minting a fresh id.
    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Run the loop until an exit word or EOF (Ctrl+D).
    pub async fn run(&self) -> banter_core::Result<()> {
        let stdin = io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        println!("Chatting as conversation {}. Type 'exit' to leave.", self.conversation_id);

        loop {
            print!("\nYou: ");
            let _ = std::io::stdout().flush();

            let line = match lines.next_line().await {
                Ok(Some(line)) => line.trim().to_string(),
                Ok(None) => break, // EOF
                Err(e) => {
                    eprintln!("input error: {e}");
                    break;
                }
            };

            if line.is_empty() {
                continue;
            }
            if is_exit_word(&line) {
                break;
            }

            if let Err(e) = self.one_turn(&line).await {
                // The engine already left the log consistent; just tell the user.
                eprintln!("\nerror: {e}");
            }
        }

        debug!(conversation = %self.conversation_id, "Console loop finished");
        Ok(())
    }

    async fn one_turn(&self, line: &str) -> banter_core::Result<()> {
        if self.streaming {
            print!("Assistant: ");
            let _ = std::io::stdout().flush();
            self.engine
                .turn_streaming(&self.conversation_id, line, |fragment| {
                    print!("{fragment}");
                    let _ = std::io::stdout().flush();
                })
                .await?;
            println!();
        } else {
            let outcome = self.engine.turn(&self.conversation_id, line).await?;
            println!("Assistant: {}", outcome.reply.content);
        }
        Ok(())
    }
}
