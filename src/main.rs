use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::debug;

mod cli;
mod config;
mod core;
mod error;
mod services;
mod signal_handler;
mod utils;

use cli::{health, library, songs};
use config::Config;
use error::{MusicLabError, Result};
use services::ServiceFactory;
use signal_handler::SignalHandler;

#[derive(Parser)]
#[command(name = "musiclab")]
#[command(about = "Song catalog with provider-enriched lyrics and paginated verses")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that storage and cache answer
    Ping(health::PingArgs),

    /// Add a song, enriching it from the lyrics provider
    Create(songs::CreateArgs),

    /// Print one stanza of a song's lyrics
    Verse(songs::VerseArgs),

    /// Change stored fields of a song
    Update(songs::UpdateArgs),

    /// Remove a song by id or by group and song name
    Delete(songs::DeleteArgs),

    /// List songs with optional filters
    List(library::ListArgs),

    /// Show configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    utils::logging::init_logging(cli.verbose).map_err(MusicLabError::Internal)?;

    let config = Config::load(cli.config.as_deref())?;

    if let Commands::Config(args) = cli.command {
        return cli::config::execute(args, &config, cli.config.as_deref()).await;
    }

    let signals = SignalHandler::new();
    let monitor = signals.start_signal_monitoring();
    let cancel = signals.token();

    let factory = ServiceFactory::new(Arc::new(config));
    let catalog = cancel.guard(factory.create_catalog()).await?;

    let result = match cli.command {
        Commands::Ping(args) => health::execute(args, &catalog, &cancel).await,
        Commands::Create(args) => songs::create(args, &catalog, &cancel).await,
        Commands::Verse(args) => songs::verse(args, &catalog, &cancel).await,
        Commands::Update(args) => songs::update(args, &catalog, &cancel).await,
        Commands::Delete(args) => songs::delete(args, &catalog, &cancel).await,
        Commands::List(args) => library::execute(args, &catalog, &cancel).await,
        Commands::Config(_) => Ok(()),
    };

    if signals.is_shutdown_requested() {
        debug!("Command interrupted by shutdown request");
    }
    monitor.abort();

    result
}
