// Google Gemini provider implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{CompletionRequest, CompletionResponse, GenerationConfig};
use super::LlmProvider;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Gemini API provider
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_API_URL.to_string(),
            default_model: "gemini-2.0-flash".to_string(),
        })
    }

    /// Create with custom default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = strip_models_prefix(&model.into()).to_string();
        self
    }

    /// Point at a different API host (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// List model names available to this API key (e.g. "models/gemini-pro")
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .context("Failed to list Gemini models")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Gemini model listing failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        let listing: ModelList = response
            .json()
            .await
            .context("Failed to parse Gemini model list")?;

        Ok(listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods.is_empty()
                    || m.supported_generation_methods
                        .iter()
                        .any(|method| method == "generateContent")
            })
            .map(|m| m.name)
            .collect())
    }

    /// Discover the best available model and pin it as the default
    pub async fn discover(self, preferred: &[String]) -> Result<Self> {
        let available = self.list_models().await?;
        tracing::info!(count = available.len(), "Available Gemini models");

        let selected = select_model(&available, preferred)
            .context("No Gemini models available for this API key")?;
        tracing::info!(model = %selected, "Using Gemini model");

        Ok(self.with_model(selected))
    }

    fn to_gemini_request(&self, request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: to_generation_config(&request.config),
        }
    }
}

fn to_generation_config(config: &GenerationConfig) -> Option<GeminiGenerationConfig> {
    if *config == GenerationConfig::default() {
        return None;
    }
    Some(GeminiGenerationConfig {
        temperature: config.temperature,
        top_p: config.top_p,
        max_output_tokens: config.max_output_tokens,
    })
}

fn strip_models_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

/// Pick the first available model matching a preferred name, in preference
/// order; otherwise the first available model.
pub fn select_model(available: &[String], preferred: &[String]) -> Option<String> {
    preferred
        .iter()
        .find_map(|wanted| available.iter().find(|name| name.contains(wanted.as_str())))
        .or_else(|| available.first())
        .cloned()
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let model = strip_models_prefix(request.model_or(&self.default_model)).to_string();
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = self.to_gemini_request(request);

        tracing::debug!(model = %model, "Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Gemini API request failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .context("Gemini returned no candidates in response")?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            text,
            model,
            provider: "gemini".to_string(),
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// Gemini API wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}
