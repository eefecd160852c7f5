// OpenAI API provider implementation
//
// Works for any OpenAI-compatible chat completions endpoint (OpenAI, Grok,
// local servers) via `with_base_url`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{CompletionRequest, CompletionResponse};
use super::LlmProvider;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// OpenAI-compatible chat completions provider
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://api.openai.com".to_string(),
            default_model: "gpt-4o-mini".to_string(),
        })
    }

    /// Create with custom default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Point at a different OpenAI-compatible host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert CompletionRequest to OpenAI API format
    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: request.model_or(&self.default_model).to_string(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            max_tokens: request.config.max_output_tokens,
            temperature: request.config.temperature,
            top_p: request.config.top_p,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let openai_request = self.to_openai_request(request);
        let url = format!("{}/v1/chat/completions", self.base_url);

        tracing::debug!(model = %openai_request.model, "Sending request to OpenAI API");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "OpenAI API request failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .context("OpenAI returned no choices in response")?;

        Ok(CompletionResponse {
            text: choice.message.content.unwrap_or_default(),
            model: openai_response.model,
            provider: "openai".to_string(),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: String,
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}
