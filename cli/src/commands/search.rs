//! SEARCH command - Notes related to free text.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use mind_ai::mind_core::AaAlgorithm;
use serde::Serialize;

use super::{AssociationRow, HumanReadable, Session, output, print_rows};

/// Arguments for the search command.
#[derive(Args)]
pub struct SearchArgs {
    /// Query text
    #[arg(required = true)]
    pub text: Vec<String>,
}

/// Leaderboard for a free-text query.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub algorithm: AaAlgorithm,
    pub associations: Vec<AssociationRow>,
}

impl HumanReadable for SearchResponse {
    fn print_human(&self) {
        println!(
            "{} {}",
            "Associations of".green().bold(),
            format!("\"{}\"", self.query).bold()
        );
        println!("{}", "=".repeat(60));
        println!("  {}: {}", "Algorithm".cyan(), self.algorithm);
        println!();
        print_rows(&self.associations);
    }
}

/// Execute the search command.
pub async fn execute(session: &mut Session, human: bool, args: SearchArgs) -> Result<()> {
    let query = args.text.join(" ");
    if query.trim().is_empty() {
        bail!("Query text is empty");
    }

    session.learn().await?;
    let board = session.search(&query).await?;

    let response = SearchResponse {
        algorithm: session.engine().algorithm(),
        associations: session.rows(&board),
        query,
    };
    output(&response, human)
}
