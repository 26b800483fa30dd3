//! # File Operation Applier
//!
//! Creates and modifies files through the [`Workspace`], whether or not the
//! target is open as a document.
//!
//! ```text
//! create_file(path)                 modify_file(path)
//!   exists? ── yes → AlreadyExists    exists? ── no → NotFound
//!   ensure ancestors (root → leaf)    capture snapshot (first time only)
//!   write bytes                       open? ── yes → replace full document text
//!   notify                                  └─ no  → overwrite bytes
//!                                     notify
//! ```
//!
//! Both hold a per-path lock for the duration of the check-then-write, so
//! two requests for the same path through this process never interleave.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use serde::Serialize;

use crate::core::error::CoreError;
use crate::core::snapshot::SnapshotStore;
use crate::workspace::Workspace;

/// Description attached to modifications coming from model output.
pub const AI_DESCRIPTION: &str = "Updated by AI";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Modify,
}

/// A single edit, consumed as soon as it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOperation {
    pub target_path: PathBuf,
    pub content: String,
    pub kind: OperationKind,
    pub description: String,
}

/// Resolves a user or model supplied path against the first workspace root.
pub fn resolve_path(workspace: &dyn Workspace, raw: &str) -> Result<PathBuf, CoreError> {
    let root = workspace.roots().into_iter().next().ok_or(CoreError::NoWorkspace)?;
    let path = Path::new(raw);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(root.join(path))
    }
}

pub struct FileApplier {
    workspace: Arc<dyn Workspace>,
    snapshots: Arc<dyn SnapshotStore>,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileApplier {
    pub fn new(workspace: Arc<dyn Workspace>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            workspace,
            snapshots,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn apply(&self, op: &FileOperation) -> Result<(), CoreError> {
        match op.kind {
            OperationKind::Create => self.create_file(&op.target_path, &op.content).await,
            OperationKind::Modify => {
                self.modify_file(&op.target_path, &op.content, &op.description)
                    .await
            }
        }
    }

    pub async fn create_file(&self, path: &Path, content: &str) -> Result<(), CoreError> {
        let lock = self.path_lock(path);
        let _guard = lock.lock().await;

        if self.workspace.exists(path).await {
            return Err(CoreError::AlreadyExists(path.to_path_buf()));
        }

        self.ensure_parent_dirs(path).await;

        self.workspace
            .write(path, content.as_bytes())
            .await
            .map_err(|e| CoreError::write(path, e))?;

        info!("Created {} ({} bytes)", path.display(), content.len());
        self.notify(&format!("Created file: {}", path.display())).await;
        Ok(())
    }

    pub async fn modify_file(
        &self,
        path: &Path,
        content: &str,
        description: &str,
    ) -> Result<(), CoreError> {
        let lock = self.path_lock(path);
        let _guard = lock.lock().await;

        if !self.workspace.exists(path).await {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }

        self.capture_snapshot(path).await;

        if self.workspace.document_text(path).is_some() {
            self.workspace
                .replace_document_text(path, content)
                .await
                .map_err(|e| CoreError::write(path, e))?;
        } else {
            self.workspace
                .write(path, content.as_bytes())
                .await
                .map_err(|e| CoreError::write(path, e))?;
        }

        info!("Modified {} ({})", path.display(), description);
        self.notify(&format!("Modified file: {} - {}", path.display(), description))
            .await;
        Ok(())
    }

    /// Records the current text as the path's baseline if none exists yet.
    /// Failures are logged; callers carry on without a baseline.
    pub async fn capture_snapshot(&self, path: &Path) {
        if self.snapshots.contains(path) {
            return;
        }
        match self.workspace.current_text(path).await {
            Ok(text) => {
                self.snapshots.set_if_absent(path, text);
            }
            Err(e) => warn!("Could not capture original content of {}: {}", path.display(), e),
        }
    }

    /// Creates each missing ancestor directory, outermost first.
    async fn ensure_parent_dirs(&self, path: &Path) {
        let Some(parent) = path.parent() else { return };

        let mut missing = Vec::new();
        for dir in parent.ancestors() {
            if dir.as_os_str().is_empty() || self.workspace.exists(dir).await {
                break;
            }
            missing.push(dir.to_path_buf());
        }

        for dir in missing.into_iter().rev() {
            if let Err(e) = self.workspace.create_dir(&dir).await {
                warn!("Failed to create directory {}: {}", dir.display(), e);
            }
        }
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self.workspace.notify(message).await {
            warn!("Notification failed: {}", e);
        }
    }

    fn path_lock(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(path.to_path_buf()).or_default().clone()
    }
}
