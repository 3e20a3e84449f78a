//! Trawl CLI - Command-line interface
//!
//! Runs the API server or performs one-off searches from the terminal.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use trawl_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "trawl", version)]
#[command(about = "Search many content sites for videos and GIFs at once")]
struct Cli {
    /// Console log level (RUST_LOG overrides)
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    /// Directory for the full per-run debug log
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())?;
    tracing::debug!("Writing full log to {}", log_file.display());

    commands::handle_command(cli.command).await
}
