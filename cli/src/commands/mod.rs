//! Command implementations for the mind CLI.
//!
//! Each command module provides:
//! - Args struct for clap argument parsing
//! - execute() function that performs the command
//! - Human-readable and JSON output formatting
//!
//! Commands drive the engine through a [`Session`]: computations are
//! submitted to the result distributor and their results arrive through the
//! consumer sinks on the CLI's main task.

pub mod associate;
pub mod search;
pub mod stats;

use anyhow::{Result, anyhow, bail};
use colored::Colorize;
use mind_ai::mind_core::{DocumentKind, DocumentRef, Leaderboard};
use mind_ai::{
    AiConfig, AssociationEngine, ConsumerContext, CorpusStatistics, LeaderboardRoute, LearnRoute,
    ResultDistributor, TextQuery,
};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::source::FileSystemSource;

/// Print output in JSON or human-readable format.
pub fn output<T: Serialize + HumanReadable>(value: &T, human: bool) -> Result<()> {
    if human {
        value.print_human();
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Trait for types that can be printed in human-readable format.
pub trait HumanReadable {
    fn print_human(&self);
}

/// Truncate a string for display, adding ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// A result received by one of the session's sinks.
#[derive(Debug)]
enum Delivered {
    Learned(bool),
    Document(DocumentRef, Leaderboard),
    Text(TextQuery, Leaderboard),
}

/// Engine, distributor and consumer sinks for one CLI invocation.
pub struct Session {
    source: Arc<FileSystemSource>,
    engine: AssociationEngine,
    distributor: ResultDistributor,
    consumer: ConsumerContext,
    worker: JoinHandle<()>,
    inbox: Rc<RefCell<VecDeque<Delivered>>>,
}

impl Session {
    /// Creates the engine over `source` and starts the distributor.
    pub fn open(config: AiConfig, source: FileSystemSource) -> Result<Self> {
        let source = Arc::new(source);
        let engine = AssociationEngine::new(config.clone(), source.clone())?;
        let (distributor, mut consumer) = ResultDistributor::from_config(&config);

        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let sink = inbox.clone();
        consumer.on_corpus_learned(move |success, _| {
            sink.borrow_mut().push_back(Delivered::Learned(success))
        })?;
        let sink = inbox.clone();
        consumer.on_document_leaderboard(move |document, board| {
            sink.borrow_mut().push_back(Delivered::Document(document, board))
        })?;
        let sink = inbox.clone();
        consumer.on_text_leaderboard(move |query, board| {
            sink.borrow_mut().push_back(Delivered::Text(query, board))
        })?;

        let worker = distributor.start()?;

        Ok(Self {
            source,
            engine,
            distributor,
            consumer,
            worker,
            inbox,
        })
    }

    /// The document source.
    pub fn source(&self) -> &FileSystemSource {
        &self.source
    }

    /// The association engine.
    pub fn engine(&self) -> &AssociationEngine {
        &self.engine
    }

    /// Learns the corpus and returns its statistics.
    pub async fn learn(&mut self) -> Result<CorpusStatistics> {
        self.distributor
            .submit(self.engine.dream(), LearnRoute::DreamToThink);

        match self.receive().await? {
            Delivered::Learned(true) => self
                .engine
                .statistics()
                .ok_or_else(|| anyhow!("corpus learned but no model published")),
            Delivered::Learned(false) => bail!("learning the corpus failed"),
            other => bail!("unexpected delivery while learning: {other:?}"),
        }
    }

    /// Leaderboard of documents related to `document`.
    pub async fn associate(&mut self, document: &DocumentRef) -> Result<Leaderboard> {
        self.distributor.submit(
            self.engine.get_associated_notes(document),
            LeaderboardRoute::Document(document.clone()),
        );

        match self.receive().await? {
            Delivered::Document(_, board) if board.is_success() => Ok(board),
            Delivered::Document(document, _) => {
                bail!("association query for {} failed", document.name)
            }
            other => bail!("unexpected delivery for document query: {other:?}"),
        }
    }

    /// Leaderboard of documents related to free text.
    pub async fn search(&mut self, text: &str) -> Result<Leaderboard> {
        self.distributor.submit(
            self.engine.get_associated_notes_by_text(text, None),
            LeaderboardRoute::Text(TextQuery {
                query: text.to_string(),
                exclude: None,
            }),
        );

        match self.receive().await? {
            Delivered::Text(_, board) if board.is_success() => Ok(board),
            Delivered::Text(query, _) => bail!("search for {:?} failed", query.query),
            other => bail!("unexpected delivery for text query: {other:?}"),
        }
    }

    /// Stops the distributor and waits for its worker.
    pub async fn close(mut self) -> Result<()> {
        self.distributor.shutdown();
        self.worker.await?;
        Ok(())
    }

    /// Oldest delivery not yet taken, waiting for the distributor if none.
    async fn receive(&mut self) -> Result<Delivered> {
        loop {
            if let Some(delivered) = self.inbox.borrow_mut().pop_front() {
                return Ok(delivered);
            }
            self.consumer
                .dispatch_next()
                .await
                .ok_or_else(|| anyhow!("result distributor stopped"))?;
        }
    }

    /// Converts a leaderboard into printable rows.
    pub fn rows(&self, board: &Leaderboard) -> Vec<AssociationRow> {
        board
            .iter()
            .enumerate()
            .map(|(rank, association)| AssociationRow {
                rank: rank + 1,
                name: association.document.name.clone(),
                kind: association.document.kind,
                path: self
                    .source
                    .path_of(&association.document.id)
                    .map(|p| p.to_path_buf()),
                score: association.score,
            })
            .collect()
    }
}

/// One leaderboard line.
#[derive(Debug, Serialize)]
pub struct AssociationRow {
    pub rank: usize,
    pub name: String,
    pub kind: DocumentKind,
    pub path: Option<PathBuf>,
    pub score: f64,
}

/// Print leaderboard rows in human-readable format.
pub fn print_rows(rows: &[AssociationRow]) {
    if rows.is_empty() {
        println!("  {}", "(No associations)".dimmed());
        return;
    }

    for row in rows {
        let kind = match row.kind {
            DocumentKind::Note => "note".normal(),
            DocumentKind::Notebook => "notebook".cyan(),
        };
        let path = row
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "{:>3}. {}  {} [{}] {}",
            row.rank,
            format!("{:.4}", row.score).yellow(),
            truncate(&row.name, 40).bold(),
            kind,
            path.dimmed()
        );
    }
}
