//! docsync CLI
//!
//! Runs the docsync HTTP service, or syncs text into Google Docs one-shot.
//!
//! # Commands
//!
//! - `serve` - Run the HTTP service
//! - `create` - Create a document holding some text
//! - `replace` - Replace the whole body of an existing document
//! - `version` - Show version information
//!
//! Every option can also be set through the environment variable named in
//! `--help`.

mod commands;

use clap::{Parser, Subcommand};
use commands::{ApiArgs, ServeArgs, TextSource};
use tracing_subscriber::EnvFilter;

/// Sync text into Google Docs documents.
#[derive(Parser)]
#[command(name = "docsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Create a document holding the given text
    Create {
        #[command(flatten)]
        source: TextSource,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Replace the whole body of an existing document
    Replace {
        /// Document id
        document_id: String,

        #[command(flatten)]
        source: TextSource,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await?,
        Commands::Create { source, api } => commands::create::run(&source, &api).await?,
        Commands::Replace {
            document_id,
            source,
            api,
        } => commands::replace::run(&document_id, &source, &api).await?,
        Commands::Version => {
            println!("docsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("docsync engine v{}", docsync_engine::VERSION);
        }
    }

    Ok(())
}
