//! # qna-harness CLI (`qnah`)
//!
//! The `qnah` binary runs the chat server and offers a few maintenance
//! commands around its data files.
//!
//! ## Usage
//!
//! ```bash
//! qnah --config ./config/qna.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qnah serve` | Start the HTTP server |
//! | `qnah ask "<message>"` | Resolve one message and print the reply |
//! | `qnah status` | Show data files and provider configuration |
//! | `qnah corpus add "<text>"` | Append an entry to the similarity corpus |
//! | `qnah corpus reindex` | Encode the corpus and report the count |
//!
//! Log verbosity follows `RUST_LOG` (default `info`). Logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use qna_harness::{ask, config, corpus_cmd, server, status};

/// qna-harness — answers chat messages from a Q&A table, past exchanges,
/// or a hosted LLM.
///
/// The config file is optional; without it every setting takes its default
/// and credentials come from `OPENAI_API_KEY` / `GROQ_API_KEY`.
#[derive(Parser)]
#[command(
    name = "qnah",
    about = "qna-harness — tiered chat backend (Q&A table → similarity → hosted LLM)",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults are used if it does not exist.
    #[arg(long, global = true, default_value = "./config/qna.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind`:`[server].port` (the `PORT` environment
    /// variable overrides the port).
    Serve,

    /// Resolve a single message and print the reply.
    Ask {
        /// The chat message.
        message: String,

        /// Print the response as JSON, including the tier that answered.
        #[arg(long)]
        json: bool,
    },

    /// Show data file and provider status.
    Status,

    /// Manage the historical-message corpus.
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },
}

#[derive(Subcommand)]
enum CorpusAction {
    /// Append an entry to the corpus file.
    Add {
        /// Text to match incoming messages against.
        text: String,

        /// Reply to return on a match. Without it the text itself is the reply.
        #[arg(long)]
        answer: Option<String>,
    },

    /// Encode every corpus entry and report how many were encoded.
    Reindex,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { message, json } => {
            ask::run_ask(&cfg, &message, json).await?;
        }
        Commands::Status => {
            status::list_status(&cfg)?;
        }
        Commands::Corpus { action } => match action {
            CorpusAction::Add { text, answer } => {
                corpus_cmd::run_corpus_add(&cfg, &text, answer.as_deref()).await?;
            }
            CorpusAction::Reindex => {
                corpus_cmd::run_corpus_reindex(&cfg).await?;
            }
        },
    }

    Ok(())
}
