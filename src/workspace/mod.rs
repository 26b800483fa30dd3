//! # Workspace
//!
//! The editor surface the core talks to: open documents, the active
//! document, byte-level file access and notifications. The core never
//! touches the file system directly; everything goes through [`Workspace`].
//!
//! ```text
//! Workspace (trait)
//! ├── roots()                   // workspace folders, first one resolves relative paths
//! ├── open_documents()          // documents currently held by the editor
//! ├── document_text(path)       // text of an open document
//! ├── replace_document_text()   // full-range replace, keeps the document open
//! ├── exists / read / write     // on-disk access
//! ├── create_dir(path)          // single directory segment
//! ├── notify(message)           // user-visible notification
//! └── subscribe()               // FileChanged / ActiveEditorChanged events
//! ```

pub mod local;
pub mod watcher;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::broadcast;

pub use local::LocalWorkspace;
pub use watcher::FileWatcher;

#[derive(Debug)]
pub enum WorkspaceError {
    Io(io::Error),
    NotFound(PathBuf),
    /// The path is not open as a document.
    NotOpen(PathBuf),
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::Io(e) => write!(f, "I/O error: {e}"),
            WorkspaceError::NotFound(p) => write!(f, "not found: {}", p.display()),
            WorkspaceError::NotOpen(p) => write!(f, "document not open: {}", p.display()),
        }
    }
}

impl std::error::Error for WorkspaceError {}

impl From<io::Error> for WorkspaceError {
    fn from(e: io::Error) -> Self {
        WorkspaceError::Io(e)
    }
}

/// A document the editor currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceFile {
    pub path: PathBuf,
    pub name: String,
    pub language_id: String,
    pub is_active: bool,
}

impl WorkspaceFile {
    pub fn new(path: &Path, is_active: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            name: display_name(path),
            language_id: language_id(path).to_string(),
            is_active,
        }
    }
}

/// Unsolicited editor events, broadcast to every connected UI.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceEvent {
    FileChanged(PathBuf),
    ActiveEditorChanged(PathBuf),
}

#[async_trait]
pub trait Workspace: Send + Sync {
    fn roots(&self) -> Vec<PathBuf>;

    fn open_documents(&self) -> Vec<PathBuf>;

    fn active_document(&self) -> Option<PathBuf>;

    /// Text of the document if it is open, `None` otherwise.
    fn document_text(&self, path: &Path) -> Option<String>;

    /// Replaces the full text of an open document.
    async fn replace_document_text(&self, path: &Path, text: &str) -> Result<(), WorkspaceError>;

    async fn exists(&self, path: &Path) -> bool;

    async fn read(&self, path: &Path) -> Result<Vec<u8>, WorkspaceError>;

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), WorkspaceError>;

    /// Creates one directory. The parent must already exist.
    async fn create_dir(&self, path: &Path) -> Result<(), WorkspaceError>;

    async fn notify(&self, message: &str) -> Result<(), WorkspaceError>;

    fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent>;

    /// The documents the editor holds, with the active one flagged.
    fn workspace_files(&self) -> Vec<WorkspaceFile> {
        let active = self.active_document();
        self.open_documents()
            .iter()
            .map(|p| WorkspaceFile::new(p, active.as_deref() == Some(p.as_path())))
            .collect()
    }

    /// Current content: the open document wins over the disk.
    async fn current_text(&self, path: &Path) -> Result<String, WorkspaceError> {
        if let Some(text) = self.document_text(path) {
            return Ok(text);
        }
        let bytes = self.read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// File name shown to the user.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Lowercased extension without the dot, empty if none.
pub fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Editor language identifier for a path.
pub fn language_id(path: &Path) -> &'static str {
    match extension(path).as_str() {
        "rs" => "rust",
        "ts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "json" => "json",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "md" | "markdown" => "markdown",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "sh" | "bash" => "shellscript",
        "xml" => "xml",
        _ => "plaintext",
    }
}
