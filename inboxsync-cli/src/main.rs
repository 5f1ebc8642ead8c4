//! Main entry point for the InboxSync CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

mod commands;

/// InboxSync CLI
#[derive(Parser)]
#[command(name = "InboxSync CLI")]
#[command(about = "Command-line client for the real-time inbox synchronization engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the InboxSync CLI
#[derive(Subcommand)]
enum Commands {
    /// Follow live inbox updates for a page
    Follow(commands::follow::FollowArgs),

    /// Send a message into a conversation
    Send(commands::send::SendArgs),

    /// Generate a configuration file
    Config {
        /// Format of the configuration file to generate (yaml or json). Defaults to yaml.
        #[arg(
            long,
            short,
            help = "Format of the configuration file to generate (yaml or json). Defaults to yaml."
        )]
        format: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Follow(args) => commands::follow::handle_follow(args).await?,
        Commands::Send(args) => commands::send::handle_send(args).await?,
        Commands::Config { format } => {
            let format = format.unwrap_or_else(|| "yaml".to_string());
            commands::config::generate_config(&format)?;
        }
    }

    Ok(())
}
