//! Cloudmgr CLI - Command-line interface for cloud provider registrations
//!
//! Provides commands for:
//! - Registering providers and inspecting their usage
//! - Requesting syncs and listing the submitted tasks
//! - Checking delete conditions
//! - Migrating legacy vCenter records
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cloudmgr_core::config::Config;

mod commands;
mod context;
mod output;

use commands::{config::ConfigCommand, migrate::MigrateCommand, provider::ProviderCommand};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "cloudmgr", version, about = "Manage cloud provider registrations")]
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

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage provider registrations
    #[command(subcommand)]
    Provider(ProviderCommand),
    /// Migrate legacy vCenter records into provider registrations
    Migrate(MigrateCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Log filter: `-q`, then `-v` repetitions, then `logging.level`
fn log_filter(cli: &Cli, config: &Config) -> String {
    if cli.quiet {
        return "error".to_string();
    }
    match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = match cli.config {
        Some(ref path) if !matches!(cli.command, Commands::Config(_)) => Config::load(path)?,
        _ => Config::load_or_default(&config_path),
    };

    // Setup tracing; RUST_LOG wins over flags and config
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(&cli, &config)));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_flag(cli.json);

    let result = match cli.command {
        Commands::Provider(ref cmd) => cmd.execute(&config, format).await,
        Commands::Migrate(ref cmd) => cmd.execute(&config, format).await,
        Commands::Config(ref cmd) => cmd.execute(&config_path, format).await,
    };

    if let Err(e) = result {
        get_formatter(format).error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
