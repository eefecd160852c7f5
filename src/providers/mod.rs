// Instruction LLM providers
//
// This module provides an abstraction layer over hosted LLM APIs (Gemini,
// OpenAI, Claude). The pipeline uses it for mood classification and reply
// refinement and never depends on a concrete vendor.

use anyhow::Result;
use async_trait::async_trait;

pub mod types;

// Provider implementations
pub mod claude;
pub mod gemini;
pub mod openai;

// Provider factory
pub mod factory;

// Re-export commonly used types
pub use factory::{connect, create_provider};
pub use types::{CompletionRequest, CompletionResponse, GenerationConfig};

/// Trait for instruction LLM providers
///
/// One prompt in, one completion out. Implementations bound their own HTTP
/// time; the pipeline adds a per-call timeout on top.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a prompt and get the complete response
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "gemini", "openai", "claude")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;
}
