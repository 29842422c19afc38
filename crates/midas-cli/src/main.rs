//! Midas CLI - Command-line client for Midas Server
//!
//! Provides commands for:
//! - Logging in and storing the API key in the system keyring
//! - Uploading local trees as folders, items and bitstreams
//! - Downloading server paths
//! - Managing the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::{LoginCommand, LogoutCommand, StatusCommand},
    completions::CompletionsCommand,
    config::ConfigCommand,
    download::DownloadCommand,
    upload::UploadCommand,
    CliContext,
};
use midas_core::config::Config;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "midas", version, about = "Command-line client for Midas Server")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in and store the API key in the system keyring
    Login(LoginCommand),
    /// Remove the stored API key
    Logout(LogoutCommand),
    /// Show server version and whether stored credentials work
    Status(StatusCommand),
    /// Upload files and directories
    Upload(UploadCommand),
    /// Download a folder or item by server path
    Download(DownloadCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Log filter: `-v` wins, then `RUST_LOG`, then the configured level
fn env_filter(verbose: u8, configured: &str) -> EnvFilter {
    let from_flag = match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    };
    match from_flag {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose, &config.logging.level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext {
        config,
        config_path,
        format,
    };

    match cli.command {
        Commands::Login(cmd) => cmd.execute(ctx).await,
        Commands::Logout(cmd) => cmd.execute(ctx).await,
        Commands::Status(cmd) => cmd.execute(ctx).await,
        Commands::Upload(cmd) => cmd.execute(ctx).await,
        Commands::Download(cmd) => cmd.execute(ctx).await,
        Commands::Config(cmd) => cmd.execute(ctx).await,
        Commands::Completions(cmd) => cmd.execute(ctx).await,
    }
}
