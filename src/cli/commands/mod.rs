//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod init;
mod pipeline;
mod serve;
mod user;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "harbor")]
#[command(about = "Browser session archive ingestion and evidence browsing platform")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema
    Init,
    /// Register newly discovered archive directories
    Register,
    /// Run the parse stage over eligible sessions
    Parse,
    /// Run the extract stage over eligible sessions
    Extract,
    /// Generate missing thumbnails
    Thumbnails,
    /// Run all pipeline stages in order
    Pipeline,
    /// Start the query and search service
    Serve {
        /// Bind address: port, host, or host:port
        #[arg(long, default_value = "127.0.0.1:3040")]
        bind: String,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },
}

/// Parse arguments and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Register => pipeline::cmd_register(&settings).await,
        Commands::Parse => pipeline::cmd_parse(&settings).await,
        Commands::Extract => pipeline::cmd_extract(&settings).await,
        Commands::Thumbnails => pipeline::cmd_thumbnails(&settings).await,
        Commands::Pipeline => pipeline::cmd_pipeline(&settings).await,
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
        Commands::User { command } => user::cmd_user(&settings, command).await,
    }
}
