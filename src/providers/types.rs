// Unified request/response types for instruction LLM providers
//
// These abstract over provider-specific formats (Gemini, OpenAI, Claude) so the
// pipeline only ever deals with a prompt in and text out.

use serde::{Deserialize, Serialize};

/// Sampling settings for one completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature (0.0 to 1.0, optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling threshold (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum tokens to generate (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationConfig {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// Single-prompt completion request
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Full instruction prompt
    pub prompt: String,

    /// Model name (provider-specific); empty means the provider default
    pub model: String,

    pub config: GenerationConfig,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: String::new(),
            config: GenerationConfig::default(),
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Model to send: the request's own, or the provider default
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.model.is_empty() {
            default
        } else {
            &self.model
        }
    }
}

/// Completion returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text, parts joined
    pub text: String,

    /// Model that generated the response
    pub model: String,

    /// Provider name (e.g., "gemini", "openai", "claude")
    pub provider: String,
}
