// Mood classification via the instruction LLM

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{bounded, Capability, PipelineError};
use crate::providers::{CompletionRequest, GenerationConfig, LlmProvider};

const MOOD_TEMPERATURE: f32 = 0.1;
const MOOD_MAX_TOKENS: u32 = 10;

/// Fixed emotion taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Happy,
    Sad,
    Angry,
    Anxious,
    Calm,
    Neutral,
}

impl MoodLabel {
    /// Enumeration order; also the order labels are searched in model output
    pub const ALL: [MoodLabel; 6] = [
        MoodLabel::Happy,
        MoodLabel::Sad,
        MoodLabel::Angry,
        MoodLabel::Anxious,
        MoodLabel::Calm,
        MoodLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Happy => "happy",
            MoodLabel::Sad => "sad",
            MoodLabel::Angry => "angry",
            MoodLabel::Anxious => "anxious",
            MoodLabel::Calm => "calm",
            MoodLabel::Neutral => "neutral",
        }
    }

    /// First label contained (case-insensitively) in free text
    pub fn recognize(text: &str) -> Option<MoodLabel> {
        let lower = text.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|label| lower.contains(label.as_str()))
    }

    /// Parse an emotion reported by the client app
    ///
    /// Only exact label names (ignoring case and surrounding whitespace) count.
    pub fn from_client_report(report: &str) -> Option<MoodLabel> {
        let report = report.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == report)
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn mood_prompt(message: &str) -> String {
    format!(
        "Classify the emotion expressed in the following message.\n\
        Answer with exactly one word from this list: happy, sad, angry, anxious, calm, neutral.\n\
        Do not add any other text.\n\n\
        Message: {}\n\n\
        Emotion:",
        message
    )
}

/// Labels a message with one of the six moods
///
/// Returns `None` when the LLM is absent or the call fails, and
/// `Some(Neutral)` when text came back without a recognizable label.
pub struct MoodClassifier {
    llm: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl MoodClassifier {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub async fn classify(&self, message: &str) -> Option<MoodLabel> {
        match self.request_label(message).await {
            Ok(raw) => {
                let label = MoodLabel::recognize(&raw).unwrap_or(MoodLabel::Neutral);
                tracing::debug!(raw = %raw.trim(), mood = %label, "Mood classified");
                Some(label)
            }
            Err(PipelineError::Unavailable(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Mood classification failed");
                None
            }
        }
    }

    async fn request_label(&self, message: &str) -> Result<String, PipelineError> {
        let llm = self
            .llm
            .as_ref()
            .ok_or(PipelineError::Unavailable(Capability::InstructionLlm))?;

        let request = CompletionRequest::new(mood_prompt(message)).with_config(
            GenerationConfig::default()
                .with_temperature(MOOD_TEMPERATURE)
                .with_max_output_tokens(MOOD_MAX_TOKENS),
        );

        let response = bounded(Capability::InstructionLlm, self.timeout, llm.complete(&request)).await?;
        Ok(response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognize_is_case_insensitive() {
        assert_eq!(MoodLabel::recognize("HAPPY"), Some(MoodLabel::Happy));
        assert_eq!(MoodLabel::recognize("The user seems Anxious."), Some(MoodLabel::Anxious));
        assert_eq!(MoodLabel::recognize("no idea"), None);
        assert_eq!(MoodLabel::recognize(""), None);
    }

    #[test]
    fn test_recognize_uses_enumeration_order() {
        // "sad" precedes "calm" in the enumeration
        assert_eq!(MoodLabel::recognize("calm but sad"), Some(MoodLabel::Sad));
    }

    #[test]
    fn test_client_report_requires_exact_label() {
        assert_eq!(MoodLabel::from_client_report(" Anxious "), Some(MoodLabel::Anxious));
        assert_eq!(MoodLabel::from_client_report("very anxious"), None);
        assert_eq!(MoodLabel::from_client_report(""), None);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MoodLabel::Calm).unwrap(), "\"calm\"");
    }

    #[test]
    fn test_prompt_lists_every_label() {
        let prompt = mood_prompt("hello");
        for label in MoodLabel::ALL {
            assert!(prompt.contains(label.as_str()));
        }
        assert!(prompt.contains("Message: hello"));
    }

    #[tokio::test]
    async fn test_absent_llm_yields_none() {
        let classifier = MoodClassifier::new(None, Duration::from_secs(1));
        assert_eq!(classifier.classify("I feel great").await, None);
    }
}
