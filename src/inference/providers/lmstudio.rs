//! LM Studio provider implementation using the Responses API.
//!
//! LM Studio v0.3.29+ serves `/v1/responses` locally, without auth.

use async_trait::async_trait;
use log::info;
use serde::Serialize;
use tokio::sync::mpsc::Sender;

use super::{InputMessage, check_status, context_to_input, forward_sse};
use crate::inference::{CompletionProvider, CompletionRequest, Effort, ProviderError, StreamChunk};

/// Configuration for reasoning tokens
#[derive(Serialize, Debug)]
struct Reasoning {
    effort: &'static str, // "low", "medium", or "high"
}

/// The request body for the Responses API
#[derive(Serialize, Debug)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<Reasoning>,
}

/// Maps our Effort enum to a Responses API effort string.
/// `None` omits reasoning entirely; `Auto` lets the server pick.
fn effort_to_string(effort: Effort) -> Option<&'static str> {
    match effort {
        Effort::High => Some("high"),
        Effort::Medium => Some("medium"),
        Effort::Low => Some("low"),
        Effort::Auto | Effort::None => None,
    }
}

/// LM Studio API provider using Responses API (local inference server)
pub struct LmStudioProvider {
    base_url: String,
    client: reqwest::Client,
}

impl LmStudioProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionProvider for LmStudioProvider {
    fn name(&self) -> &str {
        "lmstudio"
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        let body = ResponsesRequest {
            model: request.model.to_string(),
            input: context_to_input(&request.context.items),
            stream: Some(true),
            reasoning: effort_to_string(request.effort).map(|effort| Reasoning { effort }),
        };

        info!(
            "LM Studio Responses API request: model={}, input_count={}, effort={:?}",
            request.model,
            body.input.len(),
            request.effort
        );

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = check_status("LM Studio", response).await?;
        forward_sse("LM Studio", response, sender).await
    }
}
