//! ss3link - SimpliSafe alarm, lock and event-stream client
//!
//! Main entry point for the ss3link CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod prompt;

use commands::{alarm, auth, config, listen, lock};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// ss3link - SimpliSafe alarm, lock and event-stream client
#[derive(Parser)]
#[command(name = "ss3link")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration directory (credentials, config.toml, logs)
    #[arg(long, global = true, env = "SS3LINK_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, show or clear the stored session
    Auth(auth::AuthArgs),

    /// Read or change the alarm mode
    Alarm(alarm::AlarmArgs),

    /// Read or change the door lock
    Lock(lock::LockArgs),

    /// Follow the live event stream
    Listen(listen::ListenArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli
        .config_dir
        .clone()
        .or_else(ss3link_config::xdg_config_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "ss3link=debug,ss3link_oauth=debug,ss3link_http=debug,ss3link_stream=debug,ss3link_client=debug,ss3link_config=debug,info"
    } else {
        "ss3link=info,ss3link_oauth=info,ss3link_stream=info,ss3link_client=info,warn"
    };

    let file_appender = tracing_appender::rolling::daily(config_dir.join("logs"), "ss3link.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "ss3link=trace,ss3link_oauth=trace,ss3link_http=trace,ss3link_stream=trace,ss3link_client=trace,ss3link_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context::load(config_dir, cli.json, cli.verbose)?;

    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Alarm(args) => alarm::run(args, &ctx).await,
        Commands::Lock(args) => lock::run(args, &ctx).await,
        Commands::Listen(args) => listen::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
