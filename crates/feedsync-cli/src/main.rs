//! Feedsync command-line client
//!
//! Tails one configured feed in the terminal: history is fetched on mount,
//! live entries are appended as they arrive, and older pages are loaded on
//! request.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feedsync_client::ClientConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod terminal_sink;

use commands::{check, tail::TailCommand};

#[derive(Parser)]
#[command(name = "feedsync")]
#[command(about = "Follow live feeds from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "feeds.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow one feed until `quit` or Ctrl+C
    Tail(TailCommand),

    /// Validate the configuration and print each feed's endpoints
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok(),
            cli.verbose,
        ))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Tail(cmd) => commands::tail::run(cmd, &config).await?,
        Commands::Check => check::run(&config)?,
    }

    Ok(())
}

/// `RUST_LOG` wins when it parses; otherwise `--verbose` picks the level
fn log_filter(rust_log: Option<String>, verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_verbosity() {
        let filter = log_filter(Some("feedsync_client=trace".into()), false);
        assert_eq!(filter.to_string(), "feedsync_client=trace");
    }

    #[test]
    fn test_verbose_flag_without_rust_log() {
        assert_eq!(log_filter(None, true).to_string(), "debug");
        assert_eq!(log_filter(None, false).to_string(), "info");
        assert_eq!(log_filter(Some("  ".into()), true).to_string(), "debug");
    }
}
