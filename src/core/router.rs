//! # Message Router
//!
//! Takes one raw inbound message at a time and answers on the connection's
//! [`Outbox`]. Every well-formed message gets exactly one reply, success or
//! `error`; a chat may add file acknowledgements ahead of its reply.
//! Failures stay inside the reply; nothing here ends a connection.

use std::path::Path;
use std::sync::Arc;

use log::{debug, error};

use crate::core::applier::{FileApplier, resolve_path};
use crate::core::chat::ChatService;
use crate::core::diff::DiffEngine;
use crate::core::error::CoreError;
use crate::core::preview::PreviewRenderer;
use crate::core::protocol::{FileInfo, Inbound, Outbound, Outbox};
use crate::core::reload::LiveReload;
use crate::core::snapshot::{MemorySnapshotStore, SnapshotStore};
use crate::inference::{CompletionProvider, Effort};
use crate::workspace::{Workspace, display_name, language_id};

/// Description used when a modify request does not carry one.
const DEFAULT_DESCRIPTION: &str = "Modified from chat panel";

/// Settings that shape a [`Router`] built with [`Router::build`].
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub model_name: String,
    pub effort: Effort,
    pub system_prompt: String,
    pub max_snapshots: Option<usize>,
}

pub struct Router {
    workspace: Arc<dyn Workspace>,
    snapshots: Arc<dyn SnapshotStore>,
    applier: Arc<FileApplier>,
    renderer: Arc<PreviewRenderer>,
    diff: Arc<DiffEngine>,
    chat: Arc<ChatService>,
}

impl Router {
    pub fn new(
        workspace: Arc<dyn Workspace>,
        snapshots: Arc<dyn SnapshotStore>,
        applier: Arc<FileApplier>,
        renderer: Arc<PreviewRenderer>,
        diff: Arc<DiffEngine>,
        chat: Arc<ChatService>,
    ) -> Self {
        Self {
            workspace,
            snapshots,
            applier,
            renderer,
            diff,
            chat,
        }
    }

    /// Wires every component around one workspace and one snapshot store.
    pub fn build(
        workspace: Arc<dyn Workspace>,
        provider: Arc<dyn CompletionProvider>,
        reload: Arc<dyn LiveReload>,
        options: RouterOptions,
    ) -> Self {
        let snapshots: Arc<dyn SnapshotStore> =
            Arc::new(MemorySnapshotStore::new(options.max_snapshots));
        let applier = Arc::new(FileApplier::new(workspace.clone(), snapshots.clone()));
        let renderer = Arc::new(PreviewRenderer::new(reload));
        let diff = Arc::new(DiffEngine::new(workspace.clone(), snapshots.clone()));
        let chat = Arc::new(ChatService::new(
            provider,
            options.model_name,
            options.effort,
            options.system_prompt,
            workspace.clone(),
            applier.clone(),
        ));
        Self::new(workspace, snapshots, applier, renderer, diff, chat)
    }

    pub async fn handle(&self, raw: &str, outbox: &Outbox) {
        let message = match Inbound::parse(raw) {
            Ok(m) => m,
            Err(e) => {
                error!("Rejected inbound message: {}", e);
                outbox.send(Outbound::error(&e)).await;
                return;
            }
        };
        debug!("Inbound: {:?}", message);

        match self.dispatch(message, outbox).await {
            Ok(Some(reply)) => outbox.send(reply).await,
            Ok(None) => {}
            Err(e) => {
                error!("{}", e);
                outbox.send(Outbound::error(&e)).await;
            }
        }
    }

    /// Returns the reply to send, or `None` when the handler already sent it.
    async fn dispatch(
        &self,
        message: Inbound,
        outbox: &Outbox,
    ) -> Result<Option<Outbound>, CoreError> {
        let reply = match message {
            Inbound::Chat {
                message,
                execute_mode,
            } => {
                self.chat.handle(&message, execute_mode, outbox).await;
                return Ok(None);
            }
            Inbound::GetFiles => self.workspace_info(),
            Inbound::GetFileContent { file_path } => {
                let path = resolve_path(self.workspace.as_ref(), &file_path)?;
                self.file_content(&path).await?
            }
            Inbound::ModifyFile {
                file_path,
                content,
                description,
            } => {
                let path = resolve_path(self.workspace.as_ref(), &file_path)?;
                let description = description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
                self.applier.modify_file(&path, &content, &description).await?;
                Outbound::file_modified(&path)
            }
            Inbound::CreateFile { file_path, content } => {
                let path = resolve_path(self.workspace.as_ref(), &file_path)?;
                self.applier.create_file(&path, &content).await?;
                Outbound::file_created(&path)
            }
            Inbound::RenderPreview { file_path } => {
                let path = resolve_path(self.workspace.as_ref(), &file_path)?;
                let content = self.read(&path).await?;
                let artifact = self.renderer.render(&path, &content).await?;
                Outbound::Preview {
                    path: artifact.path.display().to_string(),
                    name: artifact.display_name,
                    content: artifact.content,
                    preview_type: artifact.kind,
                }
            }
            Inbound::GetDiff { file_path } => {
                let path = resolve_path(self.workspace.as_ref(), &file_path)?;
                let diff = self.diff.diff(&path).await?;
                Outbound::Diff {
                    path: diff.path.display().to_string(),
                    name: display_name(&diff.path),
                    original_content: diff.original_content,
                    current_content: diff.current_content,
                }
            }
        };
        Ok(Some(reply))
    }

    fn workspace_info(&self) -> Outbound {
        let files = self.workspace.workspace_files();
        Outbound::WorkspaceInfo {
            folders: self
                .workspace
                .roots()
                .iter()
                .map(|r| r.display().to_string())
                .collect(),
            active_file: files.iter().find(|f| f.is_active).map(FileInfo::from),
            open_files: files.iter().map(FileInfo::from).collect(),
        }
    }

    /// Reads a file and records it as the baseline on first sight.
    async fn file_content(&self, path: &Path) -> Result<Outbound, CoreError> {
        let content = self.read(path).await?;
        self.snapshots.set_if_absent(path, content.clone());
        Ok(Outbound::FileContent {
            path: path.display().to_string(),
            name: display_name(path),
            content,
            language: language_id(path).to_string(),
        })
    }

    async fn read(&self, path: &Path) -> Result<String, CoreError> {
        self.workspace
            .current_text(path)
            .await
            .map_err(|e| CoreError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}
