// Claude API provider implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{CompletionRequest, CompletionResponse};
use super::LlmProvider;

const CLAUDE_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Claude API provider
#[derive(Clone)]
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl ClaudeProvider {
    /// Create a new Claude provider
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: CLAUDE_API_URL.to_string(),
            default_model: "claude-sonnet-4-20250514".to_string(),
        })
    }

    /// Create with custom default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn to_message_request(&self, request: &CompletionRequest) -> MessageRequest {
        MessageRequest {
            model: request.model_or(&self.default_model).to_string(),
            // max_tokens is mandatory for the messages API
            max_tokens: request.config.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.config.temperature,
            top_p: request.config.top_p,
        }
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let msg_request = self.to_message_request(request);
        let url = format!("{}/v1/messages", self.base_url);

        tracing::debug!(model = %msg_request.model, "Sending request to Claude API");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&msg_request)
            .send()
            .await
            .context("Failed to send request to Claude API")?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Claude API request failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        let message_response: MessageResponse = response
            .json()
            .await
            .context("Failed to parse Claude API response")?;

        let text = message_response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(CompletionResponse {
            text,
            model: message_response.model,
            provider: "claude".to_string(),
        })
    }

    fn name(&self) -> &str {
        "claude"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    model: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}
