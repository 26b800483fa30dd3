//! # Diff Engine
//!
//! Pairs a file's recorded baseline with its current text. Line-level
//! comparison is left to the consumer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::error::CoreError;
use crate::core::snapshot::SnapshotStore;
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    pub path: PathBuf,
    pub original_content: String,
    pub current_content: String,
}

pub struct DiffEngine {
    workspace: Arc<dyn Workspace>,
    snapshots: Arc<dyn SnapshotStore>,
}

impl DiffEngine {
    pub fn new(workspace: Arc<dyn Workspace>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            workspace,
            snapshots,
        }
    }

    pub async fn diff(&self, path: &Path) -> Result<DiffResult, CoreError> {
        let original_content = self
            .snapshots
            .get(path)
            .ok_or_else(|| CoreError::NoBaseline(path.to_path_buf()))?;

        let current_content =
            self.workspace
                .current_text(path)
                .await
                .map_err(|e| CoreError::ReadError {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;

        Ok(DiffResult {
            path: path.to_path_buf(),
            original_content,
            current_content,
        })
    }
}
