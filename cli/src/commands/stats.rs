//! STATS command - Learn the corpus and report what was learned.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use mind_ai::{CorpusStatistics, EngineState};
use serde::Serialize;
use std::path::PathBuf;

use super::{HumanReadable, Session, output};

/// Arguments for the stats command.
#[derive(Args)]
pub struct StatsArgs {
    // No additional arguments needed
}

/// Statistics of the learned corpus.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub directory: PathBuf,
    pub state: EngineState,
    pub leaderboard_size: usize,
    #[serde(flatten)]
    pub statistics: CorpusStatistics,
}

impl HumanReadable for StatsResponse {
    fn print_human(&self) {
        println!("{}", "Corpus Statistics".green().bold());
        println!("{}", "=".repeat(60));
        println!();
        println!("  {}: {}", "Directory".cyan(), self.directory.display());
        println!("  {}: {}", "State".cyan(), self.state);
        println!("  {}: {}", "Algorithm".cyan(), self.statistics.algorithm);
        println!();
        println!("  {}: {}", "Documents".cyan(), self.statistics.documents);
        println!("  {}: {}", "Notes".cyan(), self.statistics.notes);
        println!("  {}: {}", "Notebooks".cyan(), self.statistics.notebooks);
        println!("  {}: {}", "Vocabulary".cyan(), self.statistics.vocabulary);
        println!(
            "  {}: {}",
            "Term occurrences".cyan(),
            self.statistics.term_occurrences
        );
        println!("  {}: {}", "Leaderboard size".cyan(), self.leaderboard_size);
    }
}

/// Execute the stats command.
pub async fn execute(session: &mut Session, human: bool, _args: StatsArgs) -> Result<()> {
    let statistics = session.learn().await?;

    let response = StatsResponse {
        directory: session.source().root().to_path_buf(),
        state: session.engine().state(),
        leaderboard_size: session.engine().leaderboard_size(),
        statistics,
    };
    output(&response, human)
}
