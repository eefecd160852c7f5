// Error types and user-friendly error messages
//
// Pipeline stages report failures with `PipelineError` and recover locally.
// Startup and configuration problems are rendered with actionable hints.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// External capabilities the chat pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Seq2seq model that writes candidate replies
    TextGeneration,
    /// Instruction-following LLM used for mood labels and refinement
    InstructionLlm,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TextGeneration => "text_generation",
            Capability::InstructionLlm => "instruction_llm",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures inside a pipeline stage.
///
/// None of these ever reach the HTTP caller: each stage maps them to its own
/// fallback value and logs them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} capability is not available")]
    Unavailable(Capability),

    #[error("{capability} call failed: {source}")]
    CallFailed {
        capability: Capability,
        #[source]
        source: anyhow::Error,
    },

    #[error("{capability} call timed out after {}s", .limit.as_secs_f32())]
    TimedOut {
        capability: Capability,
        limit: Duration,
    },

    #[error("output rejected: {0}")]
    ValidationFailed(String),
}

/// Run one external call with an upper time bound.
pub async fn bounded<T, F>(capability: Capability, limit: Duration, call: F) -> Result<T, PipelineError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(PipelineError::CallFailed { capability, source }),
        Err(_) => Err(PipelineError::TimedOut { capability, limit }),
    }
}

/// Format a config parse error with helpful suggestions
pub fn config_parse_error(path: &str, error: &str) -> String {
    format!(
        "Failed to parse config file {}\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check config file syntax:\n\
           \x1b[36mcat {}\x1b[0m\n\n\
        2. Every section is optional; remove a broken section to use its defaults\n\n\
        3. Common mistakes:\n\
           • Missing quotes around strings\n\
           • Unclosed brackets []\n\
           • Durations must be whole seconds (e.g. timeout_secs = 20)",
        path, error, path
    )
}

/// Format a missing API key error with helpful suggestions
pub fn api_key_missing_error(provider: &str) -> String {
    format!(
        "{} API key is missing\n\n\
        \x1b[1;33mMood detection and reply refinement are disabled.\x1b[0m\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Set the key in your config file:\n\
           \x1b[36m[llm]\x1b[0m\n\
           \x1b[36mapi_key = \"...\"\x1b[0m\n\n\
        2. Or export it (a .env file also works):\n\
           \x1b[36mexport GEMINI_API_KEY=\"AI...\"\x1b[0m",
        provider
    )
}

/// Format a missing generator endpoint error
pub fn generator_missing_error() -> String {
    "No text-generation endpoint configured\n\n\
    \x1b[1;33mEvery chat turn will answer with the static apology.\x1b[0m\n\n\
    \x1b[1;32mTry:\x1b[0m\n\
    1. Point the service at your model server:\n\
       \x1b[36m[generator]\x1b[0m\n\
       \x1b[36mendpoint = \"http://127.0.0.1:8080/generate\"\x1b[0m\n\n\
    2. Or export it:\n\
       \x1b[36mexport SOLACE_GENERATOR_URL=\"http://127.0.0.1:8080/generate\"\x1b[0m"
        .to_string()
}
