// Text generation capability
//
// The fine-tuned seq2seq model that writes candidate replies. Inference runs
// out of process; this module only defines the seam and an HTTP client for it.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod inference;

pub use inference::InferenceEndpointGenerator;

use crate::config::GeneratorConfig;
use crate::errors::generator_missing_error;

/// Decoding parameters for candidate generation
///
/// The defaults are the tuned values the model was evaluated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub max_length: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub do_sample: bool,
    pub repetition_penalty: f32,
    pub num_beams: u32,
    pub early_stopping: bool,
    pub no_repeat_ngram_size: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            temperature: 0.8,
            top_p: 0.92,
            do_sample: true,
            repetition_penalty: 2.0,
            num_beams: 4,
            early_stopping: true,
            no_repeat_ngram_size: 2,
        }
    }
}

/// Trait for text generation backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate decoded text for a prompt
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String>;

    /// Backend name for logs and status
    fn name(&self) -> &str;
}

/// Resolve the text generation capability once at startup
///
/// `None` means the model is not available for the process lifetime and every
/// turn short-circuits to the apology reply.
pub fn connect(config: &GeneratorConfig) -> Option<Arc<dyn TextGenerator>> {
    let endpoint = config
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let Some(endpoint) = endpoint else {
        tracing::warn!("{}", generator_missing_error());
        return None;
    };

    match InferenceEndpointGenerator::new(endpoint, config.api_token.clone(), config.timeout()) {
        Ok(generator) => {
            tracing::info!(endpoint, "Text generation endpoint configured");
            Some(Arc::new(generator))
        }
        Err(e) => {
            tracing::error!(error = %e, endpoint, "Failed to set up text generation client");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_tuned_values() {
        let params = SamplingParams::default();
        assert_eq!(params.max_length, 150);
        assert_eq!(params.temperature, 0.8);
        assert_eq!(params.top_p, 0.92);
        assert_eq!(params.repetition_penalty, 2.0);
        assert_eq!(params.num_beams, 4);
        assert_eq!(params.no_repeat_ngram_size, 2);
        assert!(params.do_sample);
        assert!(params.early_stopping);
    }

    #[test]
    fn test_connect_without_endpoint() {
        assert!(connect(&GeneratorConfig::default()).is_none());

        let config = GeneratorConfig {
            endpoint: Some("  ".to_string()),
            ..GeneratorConfig::default()
        };
        assert!(connect(&config).is_none());
    }

    #[test]
    fn test_connect_with_endpoint() {
        let config = GeneratorConfig {
            endpoint: Some("http://127.0.0.1:8080/generate".to_string()),
            ..GeneratorConfig::default()
        };
        let generator = connect(&config).unwrap();
        assert_eq!(generator.name(), "inference_endpoint");
    }
}
