// Provider factory
//
// Creates the instruction LLM from configuration

use anyhow::{bail, Context, Result};
use std::sync::Arc;

use super::claude::ClaudeProvider;
use super::gemini::GeminiProvider;
use super::openai::OpenAIProvider;
use super::LlmProvider;
use crate::config::LlmConfig;
use crate::errors::api_key_missing_error;

/// Create a provider based on the LLM configuration
///
/// Gemini without a pinned model uses its built-in default; use `connect` to
/// discover the best model available to the key.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let api_key = config
        .api_key()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!(api_key_missing_error(&config.provider)))?;

    match config.provider.as_str() {
        "gemini" => {
            let mut provider = GeminiProvider::new(api_key)?;
            if let Some(model) = &config.model {
                provider = provider.with_model(model.clone());
            }
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }

        "openai" => {
            let mut provider = OpenAIProvider::new(api_key)?;
            if let Some(model) = &config.model {
                provider = provider.with_model(model.clone());
            }
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }

        "claude" => {
            let mut provider = ClaudeProvider::new(api_key)?;
            if let Some(model) = &config.model {
                provider = provider.with_model(model.clone());
            }
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }

        _ => bail!("Unknown provider: {}", config.provider),
    }
}

async fn create_discovered_gemini(config: &LlmConfig, api_key: &str) -> Result<Arc<dyn LlmProvider>> {
    let mut provider = GeminiProvider::new(api_key.to_string())?;
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    let provider = provider
        .discover(&config.preferred_models)
        .await
        .context("Gemini model discovery failed")?;
    Ok(Arc::new(provider))
}

/// Resolve the instruction LLM capability once at startup
///
/// Returns `None` (capability absent for the process lifetime) when no key is
/// configured or the provider cannot be set up. Never fails.
pub async fn connect(config: &LlmConfig) -> Option<Arc<dyn LlmProvider>> {
    let Some(api_key) = config.api_key() else {
        tracing::warn!("{}", api_key_missing_error(&config.provider));
        return None;
    };

    let result = if config.provider == "gemini" && config.model.is_none() {
        create_discovered_gemini(config, api_key).await
    } else {
        create_provider(config)
    };

    match result {
        Ok(provider) => {
            tracing::info!(
                provider = provider.name(),
                model = provider.default_model(),
                "Instruction LLM available"
            );
            Some(provider)
        }
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "Instruction LLM unavailable, mood detection and refinement disabled");
            None
        }
    }
}
