//! banter CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive console conversation
//! - `voice`   — Spoken conversation (speech in, speech out)
//! - `serve`   — Start the web chat server
//! - `history` — Print a stored conversation transcript

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "banter",
    about = "banter — local-model chat across console, web, and voice",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat in the terminal
    Chat {
        /// Resume an existing conversation instead of starting fresh
        #[arg(short, long)]
        conversation: Option<String>,

        /// Print whole replies instead of streaming tokens
        #[arg(long)]
        no_stream: bool,
    },

    /// Talk instead of typing
    Voice,

    /// Start the web chat server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a stored conversation transcript
    History {
        /// The conversation to print
        conversation_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat {
            conversation,
            no_stream,
        } => commands::chat::run(conversation, no_stream).await?,
        Commands::Voice => commands::voice::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::History { conversation_id } => commands::history::run(&conversation_id).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn chat_flags_parse() {
        let cli = Cli::parse_from(["banter", "chat", "--conversation", "c1", "--no-stream"]);
        match cli.command {
            Commands::Chat {
                conversation,
                no_stream,
            } => {
                assert_eq!(conversation.as_deref(), Some("c1"));
                assert!(no_stream);
            }
            _ => panic!("expected chat command"),
        }
    }
}
