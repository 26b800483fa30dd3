//! OpenRouter provider implementation using the Responses API.

use async_trait::async_trait;
use log::info;
use serde::Serialize;
use tokio::sync::mpsc::Sender;

use super::{InputMessage, check_status, context_to_input, forward_sse};
use crate::inference::{CompletionProvider, CompletionRequest, Effort, ProviderError, StreamChunk};

/// Configuration for reasoning tokens
#[derive(Serialize, Debug)]
struct Reasoning {
    #[serde(skip_serializing_if = "Option::is_none")]
    effort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
}

/// The request body for the Responses API
#[derive(Serialize, Debug)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    reasoning: Reasoning,
}

/// Maps our Effort enum to a Reasoning config for the Responses API.
fn effort_to_reasoning(effort: Effort) -> Reasoning {
    let effort = match effort {
        Effort::Auto => {
            return Reasoning {
                effort: None,
                enabled: Some(true),
            };
        }
        Effort::High => "high",
        Effort::Medium => "medium",
        Effort::Low => "low",
        Effort::None => "none",
    };
    Reasoning {
        effort: Some(effort),
        enabled: None,
    }
}

/// OpenRouter API provider using Responses API
pub struct OpenRouterProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    /// Creates a new OpenRouter provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenRouter API key
    /// * `base_url` - Optional custom base URL (defaults to OpenRouter's API)
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://openrouter.ai/api/v1".to_string()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
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
            reasoning: effort_to_reasoning(request.effort),
        };

        info!(
            "OpenRouter Responses API request: model={}, input_count={}, effort={:?}",
            request.model,
            body.input.len(),
            request.effort,
        );

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = check_status("OpenRouter", response).await?;
        forward_sse("OpenRouter", response, sender).await
    }
}
