//! Documents on disk: flat UTF-8 text files named `doc_YYYYMMDD_HHMMSS.txt`
//! in the documents directory, plus two small preference files
//! (`.last_doc`, `.layout`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use platform::config::{DOC_EXTENSION, DOC_PREFIX, LAST_DOC_FILE, LAYOUT_FILE};
use ui::LayoutId;

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Reading or writing a file failed.
    #[error("{op} {path}: {source}")]
    Io {
        /// What was attempted.
        op: &'static str,
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl DocumentError {
    fn io<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Whether `name` is a document file name.
pub fn is_document_name(name: &str) -> bool {
    name.len() > DOC_PREFIX.len() + DOC_EXTENSION.len()
        && name.starts_with(DOC_PREFIX)
        && name.ends_with(DOC_EXTENSION)
        && !name.contains(['/', '\\'])
}

/// File name for a document created at `at`.
pub fn document_name(at: DateTime<Local>) -> String {
    format!("{DOC_PREFIX}{}{DOC_EXTENSION}", at.format("%Y%m%d_%H%M%S"))
}

/// A document being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Backing file. It may not exist yet.
    pub path: PathBuf,
    /// Full text.
    pub text: String,
    /// Unsaved changes.
    pub dirty: bool,
}

impl Document {
    /// Empty, unsaved document at `path`.
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            text: String::new(),
            dirty: false,
        }
    }

    /// File name shown in the status bar.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("untitled")
    }
}

/// The documents directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if needed.
    pub fn ensure_dir(&self) -> Result<(), DocumentError> {
        fs::create_dir_all(&self.dir).map_err(DocumentError::io("creating", &self.dir))
    }

    /// Document files, sorted by name (oldest first).
    pub fn list(&self) -> Result<Vec<PathBuf>, DocumentError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DocumentError::io("listing", &self.dir)(e)),
        };
        let mut docs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter(|e| e.file_name().to_str().is_some_and(is_document_name))
            .map(|e| e.path())
            .collect();
        docs.sort();
        Ok(docs)
    }

    /// Path for a new document created now.
    ///
    /// Two documents created within the same second get a numeric suffix.
    pub fn new_path(&self) -> PathBuf {
        self.new_path_at(Local::now())
    }

    /// Path for a new document created at `at`.
    pub fn new_path_at(&self, at: DateTime<Local>) -> PathBuf {
        let name = document_name(at);
        let mut path = self.dir.join(&name);
        let stem = name.trim_end_matches(DOC_EXTENSION);
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}_{n}{DOC_EXTENSION}"));
            n += 1;
        }
        path
    }

    /// Path recorded in `.last_doc`, if that file still exists.
    pub fn last_doc(&self) -> Option<PathBuf> {
        let recorded = fs::read_to_string(self.dir.join(LAST_DOC_FILE)).ok()?;
        let path = PathBuf::from(recorded.trim());
        path.is_file().then_some(path)
    }

    /// Record `path` as the document to reopen at startup.
    pub fn set_last_doc(&self, path: &Path) -> Result<(), DocumentError> {
        let file = self.dir.join(LAST_DOC_FILE);
        fs::write(&file, path.to_string_lossy().as_bytes())
            .map_err(DocumentError::io("writing", &file))
    }

    /// Preferred keyboard layout, if one was saved and is still known.
    pub fn load_layout(&self) -> Option<LayoutId> {
        let name = fs::read_to_string(self.dir.join(LAYOUT_FILE)).ok()?;
        LayoutId::from_name(name.trim())
    }

    /// Remember `layout` as the preferred keyboard layout.
    pub fn save_layout(&self, layout: LayoutId) -> Result<(), DocumentError> {
        let file = self.dir.join(LAYOUT_FILE);
        fs::write(&file, layout.name()).map_err(DocumentError::io("writing", &file))
    }

    /// Open `path`, else the last document, else a fresh one.
    ///
    /// The opened path becomes the new `.last_doc`.
    pub fn open(&self, path: Option<&Path>) -> Result<Document, DocumentError> {
        let chosen = path
            .filter(|p| p.is_file())
            .map(Path::to_path_buf)
            .or_else(|| self.last_doc());
        let doc = match chosen {
            Some(path) => {
                let text =
                    fs::read_to_string(&path).map_err(DocumentError::io("reading", &path))?;
                Document {
                    path,
                    text,
                    dirty: false,
                }
            }
            None => Document::empty(self.new_path()),
        };
        self.set_last_doc(&doc.path)?;
        tracing::info!(path = %doc.path.display(), chars = doc.text.chars().count(), "document opened");
        Ok(doc)
    }

    /// Write `doc` to disk and clear its dirty flag.
    pub fn save(&self, doc: &mut Document) -> Result<(), DocumentError> {
        fs::write(&doc.path, doc.text.as_bytes()).map_err(DocumentError::io("writing", &doc.path))?;
        doc.dirty = false;
        self.set_last_doc(&doc.path)?;
        tracing::debug!(path = %doc.path.display(), "document saved");
        Ok(())
    }

    /// Neighbour of `current` in sorted order, `forward` or backward.
    ///
    /// A current document that is not in the list (never saved) counts as
    /// the last one. `None` at either end.
    pub fn neighbour(&self, current: &Path, forward: bool) -> Result<Option<PathBuf>, DocumentError> {
        let docs = self.list()?;
        let index = docs
            .iter()
            .position(|p| p == current)
            .unwrap_or(docs.len().saturating_sub(1));
        let target = if forward {
            index.checked_add(1)
        } else {
            index.checked_sub(1)
        };
        Ok(target.and_then(|i| docs.get(i)).filter(|p| *p != current).cloned())
    }
}
