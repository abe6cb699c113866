//! rtpanel CLI - Main entry point

mod commands;

use clap::{Parser, Subcommand};
use rtpanel_foundation::PanelConfig;
use rtpanel_runtime::RuntimeService;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// rtpanel - provision and operate containerized language runtimes
#[derive(Parser, Debug)]
#[command(name = "rtpanel")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Load this config file instead of the global/project config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage runtimes
    #[command(subcommand)]
    Runtime(RuntimeCommand),
}

#[derive(Subcommand, Debug)]
pub enum RuntimeCommand {
    /// Provision a runtime from a version template and wait for its first task
    Create {
        /// Runtime kind (php, node)
        #[arg(long)]
        kind: String,

        #[arg(long)]
        name: String,

        /// Version template directory, e.g. templates/php/8.2
        #[arg(long)]
        template: PathBuf,

        /// Image reference (php)
        #[arg(long, default_value = "")]
        image: String,

        /// Package mirror (php)
        #[arg(long, default_value = "")]
        source: String,

        #[arg(long, default_value = "")]
        version: String,

        /// Code directory (node)
        #[arg(long, default_value = "")]
        code_dir: String,

        /// Run the package install step on start (node)
        #[arg(long)]
        install: bool,

        /// Extra parameter, KEY=VALUE where VALUE may be JSON
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Rebuild a PHP runtime's image and its dependent installations
    Rebuild { id: u64 },
    /// Stop and start a runtime's containers
    Recreate { id: u64 },
    /// List runtimes
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config = match &args.config {
        Some(path) => PanelConfig::load_file(path)?,
        None => PanelConfig::load()?,
    };
    tracing::debug!("Using runtime dir {}", config.runtime_dir().display());

    let service = RuntimeService::from_config(&config);

    match args.command {
        Command::Runtime(command) => commands::run(&service, command).await,
    }
}
