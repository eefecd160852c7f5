// HTTP client for a seq2seq inference endpoint
//
// Speaks the Hugging Face text2text-generation format:
//   POST {"inputs": "...", "parameters": {...}}
//   -> [{"generated_text": "..."}]  (or a bare object)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SamplingParams, TextGenerator};

pub struct InferenceEndpointGenerator {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

impl InferenceEndpointGenerator {
    pub fn new(endpoint: &str, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_token,
        })
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: &'a SamplingParams,
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<Generation>),
    Single(Generation),
}

impl InferenceResponse {
    fn into_text(self) -> Option<String> {
        match self {
            InferenceResponse::Batch(generations) => {
                generations.into_iter().next().map(|g| g.generated_text)
            }
            InferenceResponse::Single(generation) => Some(generation.generated_text),
        }
    }
}

#[async_trait]
impl TextGenerator for InferenceEndpointGenerator {
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
        let body = InferenceRequest {
            inputs: prompt,
            parameters: params,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to inference endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Inference request failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .context("Failed to parse inference response")?;

        let text = parsed
            .into_text()
            .context("Inference endpoint returned no generations")?;

        Ok(text.trim().to_string())
    }

    fn name(&self) -> &str {
        "inference_endpoint"
    }
}
