//! # Wire Protocol
//!
//! Flat JSON objects with a `type` discriminator, in both directions.
//!
//! ```text
//! in                         out
//! getFiles               →   workspaceInfo
//! getFileContent         →   fileContent
//! modifyFile             →   fileModified
//! createFile             →   fileCreated
//! renderPreview          →   preview
//! getDiff                →   diff
//! chat                   →   (fileCreated | fileModified | error)* chat
//! (editor event)         →   fileChanged | activeEditorChanged
//! anything invalid       →   error
//! ```

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::error::CoreError;
use crate::workspace::{WorkspaceEvent, WorkspaceFile, display_name};

/// Every `type` the router understands.
pub const INBOUND_TYPES: &[&str] = &[
    "getFiles",
    "getFileContent",
    "modifyFile",
    "createFile",
    "renderPreview",
    "getDiff",
    "chat",
];

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inbound {
    GetFiles,
    #[serde(rename_all = "camelCase")]
    GetFileContent { file_path: String },
    #[serde(rename_all = "camelCase")]
    ModifyFile {
        file_path: String,
        content: String,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CreateFile { file_path: String, content: String },
    #[serde(rename_all = "camelCase")]
    RenderPreview { file_path: String },
    #[serde(rename_all = "camelCase")]
    GetDiff { file_path: String },
    #[serde(rename_all = "camelCase")]
    Chat {
        message: String,
        #[serde(default)]
        execute_mode: bool,
    },
}

impl Inbound {
    /// Parses one raw message, telling malformed input apart from an
    /// unrecognized `type`.
    pub fn parse(raw: &str) -> Result<Inbound, CoreError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| CoreError::ParseError(e.to_string()))?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| CoreError::ParseError("missing \"type\" field".into()))?;
        if !INBOUND_TYPES.contains(&kind) {
            return Err(CoreError::UnknownMessageType(kind.to_string()));
        }
        serde_json::from_value(value).map_err(|e| CoreError::ParseError(e.to_string()))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub name: String,
    pub language: String,
    pub is_active: bool,
}

impl From<&WorkspaceFile> for FileInfo {
    fn from(f: &WorkspaceFile) -> Self {
        FileInfo {
            path: f.path.display().to_string(),
            name: f.name.clone(),
            language: f.language_id.clone(),
            is_active: f.is_active,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    Html,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outbound {
    #[serde(rename_all = "camelCase")]
    WorkspaceInfo {
        folders: Vec<String>,
        open_files: Vec<FileInfo>,
        active_file: Option<FileInfo>,
    },
    FileContent {
        path: String,
        name: String,
        content: String,
        language: String,
    },
    FileModified { path: String, success: bool },
    FileCreated { path: String, success: bool },
    #[serde(rename_all = "camelCase")]
    Preview {
        path: String,
        name: String,
        content: String,
        preview_type: PreviewKind,
    },
    #[serde(rename_all = "camelCase")]
    Diff {
        path: String,
        name: String,
        original_content: String,
        current_content: String,
    },
    #[serde(rename_all = "camelCase")]
    Chat {
        message: String,
        execute_mode: bool,
        files_processed: bool,
    },
    FileChanged { path: String, name: String },
    ActiveEditorChanged { path: String, name: String },
    Error { message: String },
}

impl Outbound {
    pub fn error(e: &CoreError) -> Self {
        Outbound::Error {
            message: e.to_string(),
        }
    }

    pub fn file_created(path: &Path) -> Self {
        Outbound::FileCreated {
            path: path.display().to_string(),
            success: true,
        }
    }

    pub fn file_modified(path: &Path) -> Self {
        Outbound::FileModified {
            path: path.display().to_string(),
            success: true,
        }
    }

    pub fn to_json(&self) -> String {
        // Only strings, bools and vectors of them; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"serialization failed: {e}"}}"#)
        })
    }
}

impl From<&WorkspaceEvent> for Outbound {
    fn from(event: &WorkspaceEvent) -> Self {
        match event {
            WorkspaceEvent::FileChanged(p) => Outbound::FileChanged {
                path: p.display().to_string(),
                name: display_name(p),
            },
            WorkspaceEvent::ActiveEditorChanged(p) => Outbound::ActiveEditorChanged {
                path: p.display().to_string(),
                name: display_name(p),
            },
        }
    }
}

/// Outbound half of one UI connection.
#[derive(Clone)]
pub struct Outbox {
    sender: mpsc::Sender<Outbound>,
}

impl Outbox {
    pub fn channel(capacity: usize) -> (Outbox, mpsc::Receiver<Outbound>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Outbox { sender }, receiver)
    }

    /// Queues a message. A closed connection just drops it.
    pub async fn send(&self, message: Outbound) {
        if self.sender.send(message).await.is_err() {
            debug!("Outbound message dropped: connection closed");
        }
    }
}
