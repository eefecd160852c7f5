// Candidate reply generation with retry and repetition filtering

use std::sync::Arc;
use std::time::Duration;

use super::mood::MoodLabel;
use super::repetition::RepetitionGuard;
use crate::errors::{bounded, Capability, PipelineError};
use crate::generators::{SamplingParams, TextGenerator};

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_MIN_WORDS: usize = 5;

/// Reply used when the generation model is not loaded
pub const UNAVAILABLE_REPLY: &str =
    "I'm sorry, but I'm having trouble accessing my knowledge. Please try again later.";

/// Reply used when every attempt was rejected
pub fn fallback_reply(message: &str) -> String {
    format!(
        "I understand you're asking about: {}. How can I help you with that specifically?",
        message
    )
}

fn candidate_prompt(message: &str, mood: Option<MoodLabel>) -> String {
    let mut prompt = format!(
        "Respond in a professional, empathetic, and clear manner to this mental health question:\n\n\
        Question: {}\n\n",
        message
    );
    if let Some(mood) = mood {
        prompt.push_str(&format!("User emotion: {}\n\n", mood));
    }
    prompt.push_str("Response:");
    prompt
}

/// How the candidate reply was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutcome {
    /// A generated reply passed validation on the given attempt (1-based)
    Accepted { text: String, attempt: usize },
    /// Every attempt was rejected; templated echo of the message
    Fallback(String),
    /// No generation capability; static apology
    Unavailable(String),
}

impl CandidateOutcome {
    pub fn text(&self) -> &str {
        match self {
            CandidateOutcome::Accepted { text, .. } => text,
            CandidateOutcome::Fallback(text) => text,
            CandidateOutcome::Unavailable(text) => text,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CandidateOutcome::Accepted { .. } => "accepted",
            CandidateOutcome::Fallback(_) => "fallback",
            CandidateOutcome::Unavailable(_) => "unavailable",
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CandidateOutcome::Unavailable(_))
    }
}

/// Drives the generation model until it produces an acceptable reply
pub struct CandidateGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
    guard: Arc<RepetitionGuard>,
    params: SamplingParams,
    max_attempts: usize,
    min_words: usize,
    timeout: Duration,
}

impl CandidateGenerator {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        guard: Arc<RepetitionGuard>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            guard,
            params: SamplingParams::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_words: DEFAULT_MIN_WORDS,
            timeout,
        }
    }

    pub fn with_limits(mut self, max_attempts: usize, min_words: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.min_words = min_words;
        self
    }

    pub fn is_available(&self) -> bool {
        self.generator.is_some()
    }

    pub fn guard(&self) -> &Arc<RepetitionGuard> {
        &self.guard
    }

    pub async fn generate(&self, message: &str, mood: Option<MoodLabel>) -> CandidateOutcome {
        let Some(generator) = &self.generator else {
            tracing::warn!("{}", PipelineError::Unavailable(Capability::TextGeneration));
            return CandidateOutcome::Unavailable(UNAVAILABLE_REPLY.to_string());
        };

        let prompt = candidate_prompt(message, mood);

        for attempt in 1..=self.max_attempts {
            match self.attempt(generator.as_ref(), &prompt).await {
                Ok(text) => {
                    tracing::debug!(attempt, "Candidate accepted");
                    return CandidateOutcome::Accepted { text, attempt };
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "Candidate attempt failed");
                }
            }
        }

        tracing::info!(attempts = self.max_attempts, "No acceptable candidate, using fallback");
        CandidateOutcome::Fallback(fallback_reply(message))
    }

    async fn attempt(&self, generator: &dyn TextGenerator, prompt: &str) -> Result<String, PipelineError> {
        let text = bounded(
            Capability::TextGeneration,
            self.timeout,
            generator.generate(prompt, &self.params),
        )
        .await?;

        let words = text.split_whitespace().count();
        if words <= self.min_words {
            return Err(PipelineError::ValidationFailed(format!(
                "too short ({} words)",
                words
            )));
        }

        if !self.guard.accept(&text) {
            return Err(PipelineError::ValidationFailed(
                "too similar to a recent reply".to_string(),
            ));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_with_mood() {
        let prompt = candidate_prompt("I can't sleep", Some(MoodLabel::Anxious));
        assert_eq!(
            prompt,
            "Respond in a professional, empathetic, and clear manner to this mental health question:\n\n\
            Question: I can't sleep\n\n\
            User emotion: anxious\n\n\
            Response:"
        );
    }

    #[test]
    fn test_prompt_without_mood() {
        let prompt = candidate_prompt("hello", None);
        assert!(!prompt.contains("User emotion"));
        assert!(prompt.ends_with("Question: hello\n\nResponse:"));
    }

    #[test]
    fn test_fallback_echoes_message() {
        assert_eq!(
            fallback_reply("work stress"),
            "I understand you're asking about: work stress. How can I help you with that specifically?"
        );
    }

    #[tokio::test]
    async fn test_absent_generator_short_circuits() {
        let guard = Arc::new(RepetitionGuard::default());
        let candidates = CandidateGenerator::new(None, guard.clone(), Duration::from_secs(1));
        let outcome = candidates.generate("hi", None).await;

        assert!(outcome.is_unavailable());
        assert_eq!(outcome.text(), UNAVAILABLE_REPLY);
        assert!(guard.is_empty());
    }
}
