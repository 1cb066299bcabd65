//! LocalPilot CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a starter config
//! - `agent`: Interactive chat or single-message mode
//! - `status`: Show the effective configuration
//! - `doctor`: Check config and model server reachability

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "localpilot",
    about = "LocalPilot: a coding agent for locally hosted models",
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
    /// Write a default configuration file
    Onboard,

    /// Chat with the coding agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Attach a file as context (repeatable)
        #[arg(short, long = "context", value_name = "FILE")]
        context: Vec<String>,
    },

    /// Show the effective configuration
    Status,

    /// Diagnose configuration and model server health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Agent { message, context } => commands::agent::run(message, context).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
