use std::fmt;

use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc::{self, Sender};

use super::types::{Context, Effort, StreamChunk};

/// Errors that can occur during provider operations.
#[derive(Debug)]
pub enum ProviderError {
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// API returned an error response.
    Api { status: u16, message: String },
    /// The stream carried data that is not a Responses-API event.
    Parse(String),
    /// The mpsc channel was closed (receiver dropped).
    ChannelClosed,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Network(msg) => write!(f, "network error: {msg}"),
            ProviderError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ProviderError::Parse(msg) => write!(f, "parse error: {msg}"),
            ProviderError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Everything a provider needs to fulfill a completion request.
pub struct CompletionRequest<'a> {
    pub context: &'a Context,
    pub model: &'a str,
    pub effort: Effort,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the name of the provider.
    fn name(&self) -> &str;

    /// Streams a completion based on the given request, sending chunks to the provided channel.
    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError>;
}

const COLLECT_BUFFER: usize = 64;

/// Runs a streamed completion to the end and returns the concatenated
/// content. Thinking chunks are dropped.
pub async fn collect_completion(
    provider: &dyn CompletionProvider,
    request: CompletionRequest<'_>,
) -> Result<String, ProviderError> {
    let (tx, mut rx) = mpsc::channel(COLLECT_BUFFER);

    let collector = async move {
        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            match chunk {
                StreamChunk::Content(s) => text.push_str(&s),
                StreamChunk::Thinking(s) => debug!("Discarding {} bytes of thinking", s.len()),
                StreamChunk::Completed => {}
            }
        }
        text
    };

    // The stream future owns the sender, so the collector ends when it does.
    let (result, text) = tokio::join!(provider.stream_completion(request, tx), collector);
    result?;
    debug!("{} completion collected: {} bytes", provider.name(), text.len());
    Ok(text)
}
