//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::core::error::CoreError;
use crate::core::reload::LiveReload;
use crate::core::router::{Router, RouterOptions};
use crate::inference::{
    CompletionProvider, CompletionRequest, Context, Effort, ProviderError, StreamChunk,
};
use crate::workspace::LocalWorkspace;

/// A provider that replays fixed chunks, or fails, without any network.
pub struct ScriptedProvider {
    chunks: Vec<String>,
    failure: Option<String>,
    last_context: Mutex<Option<Context>>,
}

impl ScriptedProvider {
    pub fn replying(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks.into_iter().map(String::from).collect(),
            failure: None,
            last_context: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            chunks: Vec::new(),
            failure: Some(message.to_string()),
            last_context: Mutex::new(None),
        }
    }

    /// The context of the most recent request.
    pub fn last_context(&self) -> Option<Context> {
        self.last_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        *self.last_context.lock().unwrap() = Some(request.context.clone());
        if let Some(message) = &self.failure {
            return Err(ProviderError::Network(message.clone()));
        }
        for chunk in &self.chunks {
            sender
                .send(StreamChunk::Content(chunk.clone()))
                .await
                .map_err(|_| ProviderError::ChannelClosed)?;
        }
        sender
            .send(StreamChunk::Completed)
            .await
            .map_err(|_| ProviderError::ChannelClosed)
    }
}

/// A live-reload stand-in that counts calls instead of spawning anything.
#[derive(Default)]
pub struct FakeReload {
    calls: AtomicUsize,
}

impl FakeReload {
    pub fn ensure_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveReload for FakeReload {
    async fn ensure_running(&self) -> Result<String, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("http://localhost:5173".to_string())
    }

    async fn stop(&self) {}
}

/// A router over a fresh temp directory with a scripted model.
pub fn temp_router(provider: ScriptedProvider) -> (tempfile::TempDir, Arc<LocalWorkspace>, Router) {
    let dir = tempfile::tempdir().unwrap();
    let ws = Arc::new(LocalWorkspace::new(vec![dir.path().to_path_buf()]));
    let router = Router::build(
        ws.clone(),
        Arc::new(provider),
        Arc::new(FakeReload::default()),
        RouterOptions {
            model_name: "test-model".to_string(),
            effort: Effort::None,
            system_prompt: "You help.".to_string(),
            max_snapshots: None,
        },
    );
    (dir, ws, router)
}
