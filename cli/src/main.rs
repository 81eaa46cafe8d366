//! Command-line interface for the thinking notebook's association engine.
//!
//! Loads a directory of notes, learns it and prints leaderboards:
//! - stats: Learn the corpus and report its statistics
//! - associate: Notes related to a stored note or notebook
//! - search: Notes related to free text
//!
//! Configuration via environment:
//! - MIND_DIR: Notes directory (default: current directory)
//! - MIND_AA_ALGORITHM: `bow` or `weighted-fts` (default: weighted-fts)
//! - MIND_AA_LEADERBOARD_SIZE: Maximum associations (default: 20)
//! - MIND_DISTRIBUTOR_POLL_MS: Result distributor tick (default: 100)
//! - RUST_LOG / LOG_LEVEL: Log filter, logs go to stderr (default: warn)

mod commands;
mod source;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mind_ai::AiConfig;
use mind_ai::mind_core::AaAlgorithm;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Session, associate::AssociateArgs, search::SearchArgs, stats::StatsArgs};
use source::FileSystemSource;

/// Thinking notebook associations
///
/// Find related notes in a directory of markdown and text files. Designed
/// for both scripts (JSON output) and humans (--human flag for formatted
/// output).
#[derive(Parser)]
#[command(name = "mind")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output human-readable formatted text instead of JSON
    #[arg(long, global = true)]
    human: bool,

    /// Notes directory
    #[arg(long, env = "MIND_DIR", default_value = ".", global = true)]
    dir: PathBuf,

    /// Ranking algorithm: bow or weighted-fts (overrides MIND_AA_ALGORITHM)
    #[arg(long, global = true)]
    algorithm: Option<AaAlgorithm>,

    /// Maximum associations (overrides MIND_AA_LEADERBOARD_SIZE)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    leaderboard_size: Option<u32>,

    /// Result distributor tick in milliseconds (overrides MIND_DISTRIBUTOR_POLL_MS)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    poll_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn the corpus and report its statistics
    Stats(StatsArgs),

    /// List notes related to a stored note or notebook
    Associate(AssociateArgs),

    /// List notes related to free text
    Search(SearchArgs),
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    fn config(&self) -> Result<AiConfig> {
        let mut config = AiConfig::from_env()?;
        if let Some(algorithm) = self.algorithm {
            config = config.with_algorithm(algorithm);
        }
        if let Some(size) = self.leaderboard_size {
            config = config.with_leaderboard_size(size as usize);
        }
        if let Some(millis) = self.poll_ms {
            config = config.with_poll_interval(Duration::from_millis(millis));
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config()?;
    let source = FileSystemSource::load(&cli.dir)?;
    let mut session = Session::open(config, source)?;

    let result = match cli.command {
        Commands::Stats(args) => commands::stats::execute(&mut session, cli.human, args).await,
        Commands::Associate(args) => {
            commands::associate::execute(&mut session, cli.human, args).await
        }
        Commands::Search(args) => commands::search::execute(&mut session, cli.human, args).await,
    };

    session.close().await?;
    result
}

/// Initialize tracing/logging on stderr, keeping stdout for results.
fn init_tracing() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
