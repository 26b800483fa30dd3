//! # Core Errors
//!
//! Every failure a component can report. The router turns each of these
//! into an outbound `error` message; none of them ends a connection.

use std::fmt;
use std::path::PathBuf;

use crate::inference::ProviderError;
use crate::workspace::WorkspaceError;

#[derive(Debug)]
pub enum CoreError {
    /// `createFile` target is already present.
    AlreadyExists(PathBuf),
    /// `modifyFile` target is missing.
    NotFound(PathBuf),
    /// No snapshot was ever captured for the path.
    NoBaseline(PathBuf),
    /// Neither the open document nor the disk could supply content.
    ReadError { path: PathBuf, reason: String },
    /// The workspace refused a write.
    WriteError { path: PathBuf, reason: String },
    /// No renderer for this extension.
    UnsupportedPreview(String),
    /// Inbound message carried a `type` nobody handles.
    UnknownMessageType(String),
    /// Inbound message was not well-formed.
    ParseError(String),
    /// The language-model call failed.
    UpstreamError(String),
    /// A relative path needed resolving but no workspace root is open.
    NoWorkspace,
    /// The live-reload process could not be started or never became ready.
    ReloadServer(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::AlreadyExists(p) => write!(f, "File already exists: {}", p.display()),
            CoreError::NotFound(p) => write!(f, "File not found: {}", p.display()),
            CoreError::NoBaseline(p) => {
                write!(f, "No original content recorded for {}", p.display())
            }
            CoreError::ReadError { path, reason } => {
                write!(f, "Failed to read {}: {reason}", path.display())
            }
            CoreError::WriteError { path, reason } => {
                write!(f, "Failed to write {}: {reason}", path.display())
            }
            CoreError::UnsupportedPreview(ext) => {
                write!(f, "Preview not supported for file type: {ext}")
            }
            CoreError::UnknownMessageType(t) => write!(f, "Unknown message type: {t}"),
            CoreError::ParseError(msg) => write!(f, "Failed to parse message: {msg}"),
            CoreError::UpstreamError(msg) => write!(f, "Model request failed: {msg}"),
            CoreError::NoWorkspace => write!(f, "No workspace folder open"),
            CoreError::ReloadServer(msg) => write!(f, "Live preview server error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<ProviderError> for CoreError {
    fn from(e: ProviderError) -> Self {
        CoreError::UpstreamError(e.to_string())
    }
}

impl CoreError {
    /// Wraps a workspace write failure for `path`.
    pub fn write(path: &std::path::Path, e: WorkspaceError) -> Self {
        CoreError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    }
}
