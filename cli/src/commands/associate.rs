//! ASSOCIATE command - Notes related to a stored note or notebook.

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use mind_ai::mind_core::{AaAlgorithm, DocumentKind};
use serde::Serialize;
use std::path::PathBuf;

use super::{AssociationRow, HumanReadable, Session, output, print_rows};

/// Arguments for the associate command.
#[derive(Args)]
pub struct AssociateArgs {
    /// Note file (or notebook directory) relative to --dir
    pub path: PathBuf,
}

/// Leaderboard for a document.
#[derive(Debug, Serialize)]
pub struct AssociateResponse {
    pub document: String,
    pub kind: DocumentKind,
    pub path: PathBuf,
    pub algorithm: AaAlgorithm,
    pub associations: Vec<AssociationRow>,
}

impl HumanReadable for AssociateResponse {
    fn print_human(&self) {
        println!(
            "{} {} {}",
            "Associations of".green().bold(),
            self.document.bold(),
            format!("({})", self.path.display()).dimmed()
        );
        println!("{}", "=".repeat(60));
        println!("  {}: {}", "Algorithm".cyan(), self.algorithm);
        println!();
        print_rows(&self.associations);
    }
}

/// Execute the associate command.
pub async fn execute(session: &mut Session, human: bool, args: AssociateArgs) -> Result<()> {
    let document = session
        .source()
        .find(&args.path)
        .cloned()
        .ok_or_else(|| anyhow!("No note or notebook at {}", args.path.display()))?;

    session.learn().await?;
    let board = session.associate(&document).await?;

    let response = AssociateResponse {
        document: document.name.clone(),
        kind: document.kind,
        path: args.path,
        algorithm: session.engine().algorithm(),
        associations: session.rows(&board),
    };
    output(&response, human)
}
