//! PromptMaster CLI, the main entry point.
//!
//! Commands:
//! - `onboard`    Initialize config & data directory
//! - `generate`   Synthesize a bilingual prompt from text or an image
//! - `learn`      Teach the knowledge base from a PDF
//! - `knowledge`  Show, replace, reset or audit the knowledge base
//! - `models`     List target models
//! - `tags`       List style tags
//! - `key`        Store the API key
//! - `status`     Show configuration and knowledge base state

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "promptmaster",
    about = "PromptMaster: bilingual prompt synthesis for generative image and video models",
    version
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
    /// Initialize configuration and data directory
    Onboard,

    /// Synthesize an optimized prompt
    Generate {
        /// Description of the desired image or video
        text: Option<String>,

        /// Reverse-engineer from a reference image instead
        #[arg(short, long, conflicts_with = "text")]
        image: Option<PathBuf>,

        /// Extra notes for image mode
        #[arg(short, long, requires = "image")]
        notes: Option<String>,

        /// Target model id (see `promptmaster models`)
        #[arg(short, long)]
        model: Option<String>,

        /// Style tag id to enforce; repeatable (see `promptmaster tags`)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Learn from a PDF and append the knowledge to the corpus
    Learn {
        /// Path to the PDF
        file: PathBuf,
    },

    /// Inspect or edit the knowledge base
    Knowledge {
        #[command(subcommand)]
        action: KnowledgeAction,
    },

    /// List target models
    Models,

    /// List style tags
    Tags,

    /// Store the API key
    Key {
        /// The API key (starts with "AIza")
        value: String,
    },

    /// Show configuration and knowledge base state
    Status {
        /// Also verify the API key against the remote model
        #[arg(long)]
        check: bool,
    },
}

#[derive(Subcommand)]
pub enum KnowledgeAction {
    /// Print the current corpus
    Show,
    /// Replace the corpus with the contents of a file
    Set {
        file: PathBuf,
    },
    /// Restore the default corpus (history is kept)
    Reset,
    /// List learned documents, newest first
    History,
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
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "PromptMaster starting");

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Generate {
            text,
            image,
            notes,
            model,
            tags,
            json,
        } => {
            commands::generate::run(commands::generate::GenerateArgs {
                text,
                image,
                notes,
                model,
                tags,
                json,
            })
            .await?
        }
        Commands::Learn { file } => commands::learn::run(file).await?,
        Commands::Knowledge { action } => commands::knowledge::run(action).await?,
        Commands::Models => commands::catalog::models(),
        Commands::Tags => commands::catalog::tags(),
        Commands::Key { value } => commands::key::run(value).await?,
        Commands::Status { check } => commands::status::run(check).await?,
    }

    Ok(())
}
