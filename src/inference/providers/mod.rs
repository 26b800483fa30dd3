//! Responses-API providers and the SSE reader they share.
//!
//! Both backends stream the same event vocabulary:
//! `response.output_text.delta`, `response.reasoning_text.delta` /
//! `response.reasoning_summary_text.delta` and `response.completed`.
//! OpenRouter also embeds the event type in the JSON payload, so the reader
//! falls back to the `type` field when no `event:` line preceded the data.

mod lmstudio;
mod openrouter;

pub use lmstudio::LmStudioProvider;
pub use openrouter::OpenRouterProvider;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::inference::{ContextSegment, ProviderError, Source, StreamChunk};

/// Role in an input message (OpenAI terminology)
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
}

/// A single message in the input array
#[derive(Serialize, Debug, Clone)]
struct InputMessage {
    #[serde(rename = "type")]
    item_type: &'static str,
    role: Role,
    content: String,
}

/// Converts context segments into Responses API input format.
fn context_to_input(items: &[ContextSegment]) -> Vec<InputMessage> {
    items
        .iter()
        .map(|seg| InputMessage {
            item_type: "message",
            role: match seg.source {
                Source::Directive => Role::System,
                Source::User => Role::User,
            },
            content: seg.content.clone(),
        })
        .collect()
}

/// Generic SSE event wrapper to extract the type field and delta.
#[derive(Deserialize, Debug)]
struct SseEvent {
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    delta: String,
}

/// Checks the HTTP status and turns a failure body into `ProviderError::Api`.
async fn check_status(
    label: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    debug!("{} response status: {}", label, response.status());
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    warn!("{} API error: {} - {}", label, status, message);
    Err(ProviderError::Api { status, message })
}

/// Reads a Responses-API SSE body, forwarding deltas to `sender`.
async fn forward_sse(
    label: &str,
    mut response: reqwest::Response,
    sender: Sender<StreamChunk>,
) -> Result<(), ProviderError> {
    let mut buffer = String::new();
    let mut current_event_type: Option<String> = None;
    let mut total_content_len = 0usize;
    let mut chunk_count = 0usize;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?
    {
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        // Process complete lines from buffer
        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim().to_string();
            buffer.drain(..pos + 1);

            if let Some(event_type) = line.strip_prefix("event: ") {
                current_event_type = Some(event_type.to_string());
                continue;
            }

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data == "[DONE]" {
                debug!("Received [DONE] marker");
                continue;
            }

            // A garbled stream would otherwise end as a truncated reply that
            // still gets written to disk.
            let event = serde_json::from_str::<SseEvent>(data).map_err(|e| {
                warn!("{} sent malformed SSE data ({}): {}", label, e, data);
                ProviderError::Parse(format!("{e} in SSE data: {data}"))
            })?;
            let event_type = current_event_type
                .take()
                .unwrap_or_else(|| event.event_type.clone());

            let outgoing = match event_type.as_str() {
                "response.output_text.delta" if !event.delta.is_empty() => {
                    total_content_len += event.delta.len();
                    StreamChunk::Content(event.delta)
                }
                "response.reasoning_text.delta" | "response.reasoning_summary_text.delta"
                    if !event.delta.is_empty() =>
                {
                    StreamChunk::Thinking(event.delta)
                }
                "response.completed" => {
                    info!(
                        "{} stream complete: {} chunks, {} content bytes",
                        label, chunk_count, total_content_len
                    );
                    if sender.send(StreamChunk::Completed).await.is_err() {
                        warn!("Completed send failed: receiver dropped");
                        return Err(ProviderError::ChannelClosed);
                    }
                    return Ok(());
                }
                other => {
                    debug!("Ignoring event type '{}': {} bytes", other, data.len());
                    continue;
                }
            };

            chunk_count += 1;
            if sender.send(outgoing).await.is_err() {
                warn!("Chunk send failed: receiver dropped");
                return Err(ProviderError::ChannelClosed);
            }
        }
    }

    info!(
        "{} stream ended: {} chunks processed, {} total content bytes",
        label, chunk_count, total_content_len
    );
    Ok(())
}
