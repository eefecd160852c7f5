// Reply refinement
//
// Rewrites the model's formal candidate into a casual, texting-style reply.
// Strictly additive: any failure hands back the candidate untouched.

use std::sync::Arc;
use std::time::Duration;

use super::mood::MoodLabel;
use crate::crisis::CrisisAssessment;
use crate::errors::{bounded, Capability, PipelineError};
use crate::providers::{CompletionRequest, LlmProvider};

const STYLE_GUIDELINES: &str = "\
1. Use casual, everyday language, like texting a close friend.
2. Use contractions (I'm, you're, it's, don't).
3. Short sentences and the occasional fragment are fine.
4. Be warm and genuine, never clinical or preachy.
5. Acknowledge their feelings before offering anything else.
6. Offer one or two practical, gentle suggestions at most.
7. Skip formal openings, headings, lists, and sign-offs.
8. Keep the whole reply under 100 words.";

const CRISIS_GUIDANCE: &str = "\
IMPORTANT: this person may be in crisis. Keep the warmth, but don't downplay how serious this is. \
Gently and clearly encourage them to reach out right now to the crisis support listed alongside your reply, \
and let them know they don't have to go through this alone.";

fn refine_prompt(message: &str, candidate: &str, mood: Option<MoodLabel>, crisis: &CrisisAssessment) -> String {
    let mut prompt = String::from(
        "You're a supportive friend texting someone who reached out about their mental health. \
        Rewrite the draft reply below so it sounds like a real text message.\n\n",
    );

    prompt.push_str(&format!("Their message: {}\n", message));
    if let Some(mood) = mood {
        prompt.push_str(&format!("They seem to be feeling: {}\n", mood));
    }
    prompt.push_str(&format!("\nDraft reply: {}\n\n", candidate));

    prompt.push_str("Guidelines:\n");
    prompt.push_str(STYLE_GUIDELINES);
    prompt.push_str("\n\n");

    if crisis.is_crisis {
        prompt.push_str(CRISIS_GUIDANCE);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Reply with the rewritten message only.");
    prompt
}

pub struct ResponseRefiner {
    llm: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl ResponseRefiner {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// Refined reply, or the candidate itself when refinement is not possible
    pub async fn refine(
        &self,
        message: &str,
        candidate: &str,
        mood: Option<MoodLabel>,
        crisis: &CrisisAssessment,
    ) -> String {
        match self.try_refine(message, candidate, mood, crisis).await {
            Ok(text) => text,
            Err(PipelineError::Unavailable(_)) => candidate.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Refinement failed, keeping candidate");
                candidate.to_string()
            }
        }
    }

    async fn try_refine(
        &self,
        message: &str,
        candidate: &str,
        mood: Option<MoodLabel>,
        crisis: &CrisisAssessment,
    ) -> Result<String, PipelineError> {
        let llm = self
            .llm
            .as_ref()
            .ok_or(PipelineError::Unavailable(Capability::InstructionLlm))?;

        let request = CompletionRequest::new(refine_prompt(message, candidate, mood, crisis));
        let response = bounded(Capability::InstructionLlm, self.timeout, llm.complete(&request)).await?;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(PipelineError::ValidationFailed("empty refinement".to_string()));
        }
        Ok(text.to_string())
    }
}
