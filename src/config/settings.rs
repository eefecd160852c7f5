// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level service configuration
///
/// Every section has defaults, so an empty TOML file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub generator: GeneratorConfig,
    pub pipeline: PipelineConfig,
    pub resources: ResourcesConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000")
    pub bind_address: String,
    /// Allow cross-origin requests from the mobile/web client
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            cors_enabled: true,
        }
    }
}

/// Instruction LLM used for mood detection and reply refinement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "gemini", "openai", or "claude"
    pub provider: String,
    /// API key; the capability is disabled when empty
    pub api_key: Option<String>,
    /// Pinned model; when unset Gemini picks from `preferred_models`
    pub model: Option<String>,
    /// Override for the provider's API base URL
    pub base_url: Option<String>,
    /// Models to look for, in priority order, when discovering Gemini models
    pub preferred_models: Vec<String>,
    /// Upper bound for a single LLM call
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key: None,
            model: None,
            base_url: None,
            preferred_models: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-1.5-pro".to_string(),
                "gemini-pro".to_string(),
            ],
            timeout_secs: 20,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Seq2seq model server that writes candidate replies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Inference endpoint URL; the capability is disabled when unset
    pub endpoint: Option<String>,
    /// Optional bearer token for the endpoint
    pub api_token: Option<String>,
    /// Upper bound for a single generation attempt
    pub timeout_secs: u64,
    /// Maximum generation attempts per turn
    pub max_attempts: usize,
    /// A candidate must have strictly more words than this
    pub min_words: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_token: None,
            timeout_secs: 30,
            max_attempts: 3,
            min_words: 5,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tuning for the response-composition pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How many accepted candidates the repetition guard remembers
    pub history_capacity: usize,
    /// Similarity above which a candidate counts as a repeat
    pub similarity_threshold: f64,
    /// Crisis confidence above which resources are prefixed to the reply
    pub escalation_threshold: f64,
    /// Optional JSON file overriding the built-in crisis keyword table
    pub crisis_keywords_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 5,
            similarity_threshold: 0.6,
            escalation_threshold: 0.8,
            crisis_keywords_path: None,
        }
    }
}

/// Cached informational content served by `/resources`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Directory holding `scraped_data_{n}.txt` files
    pub dir: PathBuf,
    /// Pages to scrape, one cache file each
    pub sources: Vec<String>,
    /// Upper bound for fetching a single page
    pub timeout_secs: u64,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("resources"),
            sources: vec![
                "https://www.nimh.nih.gov/health/publications/5-action-steps-to-help-someone-having-thoughts-of-suicide".to_string(),
                "https://www.nimh.nih.gov/health/publications/depression".to_string(),
                "https://www.nimh.nih.gov/health/publications/generalized-anxiety-disorder-gad".to_string(),
                "https://www.nimh.nih.gov/health/publications/my-mental-health-do-i-need-help".to_string(),
                "https://www.nimh.nih.gov/health/publications/panic-disorder-when-fear-overwhelms".to_string(),
            ],
            timeout_secs: 20,
        }
    }
}

impl ResourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
