//! ChatRecall CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config file
//! - `run`: Serve Telegram group chats
//! - `chat`: Local group chat in the terminal
//! - `ask`: Ask one question and print the answer
//! - `remember`: Store one message in long-term memory
//! - `status`: Show the effective configuration
//! - `doctor`: Check that every backend is reachable

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "chatrecall",
    about = "ChatRecall — a group-chat bot with long-term memory",
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
    /// Initialize configuration
    Onboard,

    /// Serve Telegram chats until Ctrl+C
    Run,

    /// Chat with the bot from the terminal
    Chat {
        /// Author used for lines without an `author:` prefix
        #[arg(short, long, default_value = "@you")]
        author: String,
    },

    /// Ask a single question
    Ask {
        /// The question
        question: String,

        /// Conversation the question belongs to
        #[arg(short, long, default_value = "cli")]
        conversation: String,

        /// Who is asking
        #[arg(short, long, default_value = "@you")]
        author: String,

        /// Answer from a web search instead of memory
        #[arg(short, long)]
        web: bool,
    },

    /// Store a message in long-term memory
    Remember {
        /// Text to remember
        text: String,

        /// Conversation the memory belongs to
        #[arg(short, long, default_value = "cli")]
        conversation: String,

        /// Author of the message
        #[arg(short, long, default_value = "@you")]
        author: String,
    },

    /// Show effective configuration
    Status,

    /// Diagnose backend health
    Doctor,
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
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Run => commands::serve::run().await?,
        Commands::Chat { author } => commands::chat::run(author).await?,
        Commands::Ask {
            question,
            conversation,
            author,
            web,
        } => commands::ask::run(question, conversation, author, web).await?,
        Commands::Remember {
            text,
            conversation,
            author,
        } => commands::remember::run(text, conversation, author).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
