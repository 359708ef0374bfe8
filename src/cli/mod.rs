//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod config;
pub mod route;
pub mod search;
pub mod serve;
pub mod simulate;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// 3D navigation map session controller
#[derive(Parser)]
#[command(name = "navmap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a place name to coordinates
    Search(search::SearchArgs),

    /// Plan a route to a destination
    Route(route::RouteArgs),

    /// Drive a headless map session from a script
    Simulate(simulate::SimulateArgs),

    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Initialize logging to stderr; `RUST_LOG` overrides the default directive
pub fn init_logging(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the CLI
pub async fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(_) | Commands::Simulate(_) => init_logging("info"),
        _ => init_logging("warn"),
    }

    match cli.command {
        Commands::Search(args) => search::run(args).await,
        Commands::Route(args) => route::run(args).await,
        Commands::Simulate(args) => simulate::run(args).await,
        Commands::Serve(args) => serve::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}
