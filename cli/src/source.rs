//! Directory of plain-text notes as a document source.
//!
//! Layout:
//!
//! ```text
//! notes/
//!   inbox.md              note "inbox"
//!   rust/                 notebook "rust", described by README.md
//!     README.md
//!     ownership.md        note "ownership"
//!     lifetimes.txt       note "lifetimes"
//! ```
//!
//! Only `.md` and `.txt` files are notes; hidden entries are skipped. Bodies
//! are read from disk on demand, so a relearn sees edited files.

use anyhow::{Context, Result};
use mind_core::{DocumentId, DocumentRef, DocumentSource};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NOTE_EXTENSIONS: &[&str] = &["md", "txt"];
const NOTEBOOK_DESCRIPTION: &str = "README.md";

#[derive(Debug, Clone)]
struct StoredDocument {
    document: DocumentRef,
    /// Path relative to the root, as shown to users.
    relative: PathBuf,
    /// File holding the body, if any.
    body: Option<PathBuf>,
}

/// Notes and notebooks loaded from a directory tree.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
    documents: Vec<StoredDocument>,
}

impl FileSystemSource {
    /// Scans `root` for notebooks and notes.
    pub fn load(root: &Path) -> Result<Self> {
        let mut documents = Vec::new();

        for path in sorted_entries(root)? {
            if path.is_dir() {
                load_notebook(root, &path, &mut documents)?;
            } else if is_note(&path) {
                documents.push(stored_note(root, &path));
            }
        }

        debug!(
            "Loaded {} documents from {}",
            documents.len(),
            root.display()
        );
        Ok(Self {
            root: root.to_path_buf(),
            documents,
        })
    }

    /// The scanned directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no notes or notebooks were found.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Finds the document stored at a path relative to the root.
    pub fn find(&self, relative: &Path) -> Option<&DocumentRef> {
        self.documents
            .iter()
            .find(|stored| stored.relative == relative)
            .map(|stored| &stored.document)
    }

    /// Path of a document relative to the root.
    pub fn path_of(&self, id: &DocumentId) -> Option<&Path> {
        self.documents
            .iter()
            .find(|stored| stored.document.id == *id)
            .map(|stored| stored.relative.as_path())
    }
}

impl DocumentSource for FileSystemSource {
    fn all_documents(&self) -> Vec<DocumentRef> {
        self.documents.iter().map(|s| s.document.clone()).collect()
    }

    fn text(&self, id: &DocumentId) -> Option<String> {
        let stored = self.documents.iter().find(|s| s.document.id == *id)?;
        let body = stored.body.as_ref()?;
        match fs::read_to_string(body) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Cannot read {}: {}", body.display(), e);
                None
            }
        }
    }
}

fn load_notebook(root: &Path, dir: &Path, documents: &mut Vec<StoredDocument>) -> Result<()> {
    let description = dir.join(NOTEBOOK_DESCRIPTION);
    documents.push(StoredDocument {
        document: DocumentRef::notebook(file_name(dir)),
        relative: relative_to(root, dir),
        body: description.is_file().then_some(description),
    });

    for path in sorted_entries(dir)? {
        if path.is_file() && is_note(&path) && !is_description(&path) {
            documents.push(stored_note(root, &path));
        }
    }
    Ok(())
}

fn stored_note(root: &Path, path: &Path) -> StoredDocument {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    StoredDocument {
        document: DocumentRef::note(name),
        relative: relative_to(root, path),
        body: Some(path.to_path_buf()),
    }
}

/// Non-hidden entries of a directory, in name order.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Cannot read directory {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("Cannot list {}", dir.display()))?;
        if !entry.file_name().to_string_lossy().starts_with('.') {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_note(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            NOTE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn is_description(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().eq_ignore_ascii_case(NOTEBOOK_DESCRIPTION))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mind_core::DocumentKind;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, text: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "inbox.md", "loose thoughts");
        write(dir.path(), "image.png", "not a note");
        write(dir.path(), ".hidden.md", "skipped");
        write(dir.path(), "rust/README.md", "notes about rust");
        write(dir.path(), "rust/ownership.md", "single owner");
        write(dir.path(), "rust/lifetimes.txt", "borrow scopes");
        write(dir.path(), "baking/sourdough.md", "starter");
        dir
    }

    #[test]
    fn load_directory_layout() {
        let dir = layout();
        let source = FileSystemSource::load(dir.path()).unwrap();

        let documents: Vec<(String, DocumentKind)> = source
            .all_documents()
            .into_iter()
            .map(|d| (d.name, d.kind))
            .collect();

        assert_eq!(
            documents,
            vec![
                ("baking".to_string(), DocumentKind::Notebook),
                ("sourdough".to_string(), DocumentKind::Note),
                ("inbox".to_string(), DocumentKind::Note),
                ("rust".to_string(), DocumentKind::Notebook),
                ("lifetimes".to_string(), DocumentKind::Note),
                ("ownership".to_string(), DocumentKind::Note),
            ]
        );
        assert_eq!(source.len(), 6);
    }

    #[test]
    fn text_reads_bodies() {
        let dir = layout();
        let source = FileSystemSource::load(dir.path()).unwrap();

        let ownership = source.find(Path::new("rust/ownership.md")).unwrap();
        assert_eq!(source.text(&ownership.id).as_deref(), Some("single owner"));

        let rust = source.find(Path::new("rust")).unwrap();
        assert_eq!(source.text(&rust.id).as_deref(), Some("notes about rust"));

        let baking = source.find(Path::new("baking")).unwrap();
        assert_eq!(source.text(&baking.id), None);
    }

    #[test]
    fn text_sees_edits() {
        let dir = layout();
        let source = FileSystemSource::load(dir.path()).unwrap();
        let inbox = source.find(Path::new("inbox.md")).unwrap().clone();

        write(dir.path(), "inbox.md", "edited");

        assert_eq!(source.text(&inbox.id).as_deref(), Some("edited"));
    }

    #[test]
    fn path_of_document() {
        let dir = layout();
        let source = FileSystemSource::load(dir.path()).unwrap();
        let inbox = source.find(Path::new("inbox.md")).unwrap();

        assert_eq!(source.path_of(&inbox.id), Some(Path::new("inbox.md")));
        assert_eq!(source.path_of(&DocumentId::new()), None);
    }

    #[test]
    fn missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        assert!(FileSystemSource::load(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn empty_directory_is_empty_corpus() {
        let dir = TempDir::new().unwrap();
        let source = FileSystemSource::load(dir.path()).unwrap();
        assert!(source.is_empty());
    }
}
