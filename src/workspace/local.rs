//! Headless [`Workspace`] over the local file system.
//!
//! Open documents live in memory and are written through to disk on every
//! replace, so a later disk read sees the same text the document holds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::broadcast;

use super::{Workspace, WorkspaceError, WorkspaceEvent};

const EVENT_CAPACITY: usize = 256;

#[derive(Default)]
struct Documents {
    /// Insertion order is the editor's tab order.
    order: Vec<PathBuf>,
    text: HashMap<PathBuf, String>,
    active: Option<PathBuf>,
}

pub struct LocalWorkspace {
    roots: Vec<PathBuf>,
    documents: Mutex<Documents>,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl LocalWorkspace {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            roots,
            documents: Mutex::new(Documents::default()),
            events,
        }
    }

    /// Opens `path` as a document and makes it active.
    pub async fn open_document(&self, path: &Path) -> Result<(), WorkspaceError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => WorkspaceError::NotFound(path.to_path_buf()),
            _ => WorkspaceError::Io(e),
        })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        {
            let mut docs = self.lock();
            if !docs.text.contains_key(path) {
                docs.order.push(path.to_path_buf());
            }
            docs.text.insert(path.to_path_buf(), text);
        }
        info!("Opened document {}", path.display());
        self.set_active(path);
        Ok(())
    }

    /// Marks an open document active and tells subscribers.
    pub fn set_active(&self, path: &Path) {
        {
            let mut docs = self.lock();
            if !docs.text.contains_key(path) {
                return;
            }
            docs.active = Some(path.to_path_buf());
        }
        let _ = self
            .events
            .send(WorkspaceEvent::ActiveEditorChanged(path.to_path_buf()));
    }

    /// Publishes an externally observed change (see [`super::FileWatcher`]).
    pub fn file_changed(&self, path: &Path) {
        let _ = self.events.send(WorkspaceEvent::FileChanged(path.to_path_buf()));
    }

    /// Sender side of the event bus, for the file watcher.
    pub fn event_sender(&self) -> broadcast::Sender<WorkspaceEvent> {
        self.events.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Documents> {
        // A poisoned lock only means a panic mid-update of plain maps; keep serving.
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Workspace for LocalWorkspace {
    fn roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }

    fn open_documents(&self) -> Vec<PathBuf> {
        self.lock().order.clone()
    }

    fn active_document(&self) -> Option<PathBuf> {
        self.lock().active.clone()
    }

    fn document_text(&self, path: &Path) -> Option<String> {
        self.lock().text.get(path).cloned()
    }

    async fn replace_document_text(&self, path: &Path, text: &str) -> Result<(), WorkspaceError> {
        {
            let mut docs = self.lock();
            let slot = docs
                .text
                .get_mut(path)
                .ok_or_else(|| WorkspaceError::NotOpen(path.to_path_buf()))?;
            *slot = text.to_string();
        }
        tokio::fs::write(path, text.as_bytes()).await?;
        debug!("Replaced document text of {} ({} bytes)", path.display(), text.len());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, WorkspaceError> {
        tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => WorkspaceError::NotFound(path.to_path_buf()),
            _ => WorkspaceError::Io(e),
        })
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), WorkspaceError> {
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn create_dir(&self, path: &Path) -> Result<(), WorkspaceError> {
        tokio::fs::create_dir(path).await?;
        Ok(())
    }

    async fn notify(&self, message: &str) -> Result<(), WorkspaceError> {
        info!("Notification: {}", message);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }
}
