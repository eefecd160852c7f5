// Chat turn pipeline tests
//
// Drive the full turn with scripted text generation and instruction LLM mocks:
// 1. Crisis messages escalate with a resource block ahead of the reply
// 2. Short or repetitive candidates are retried, then replaced by the fallback
// 3. A missing generation model short-circuits to the apology
// 4. Mood keeps its three states (absent / neutral / label)

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use solace::config::Config;
use solace::crisis::{
    CrisisAssessment, CrisisCategory, CrisisClassifier, RESOURCE_BLOCK_HEADING,
};
use solace::generators::{SamplingParams, TextGenerator};
use solace::pipeline::{
    fallback_reply, CandidateGenerator, CandidateOutcome, MoodLabel, RepetitionGuard,
    TurnPipeline, TurnStage, UNAVAILABLE_REPLY,
};
use solace::providers::{CompletionRequest, CompletionResponse, LlmProvider};

/// Generator that replays a script; the last entry repeats forever
struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    fn new(script: Vec<Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|step| step.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    fn always(text: &str) -> Self {
        Self::new(vec![Ok(text)])
    }

    fn slow(text: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::always(text)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _params: &SamplingParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match step {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => anyhow::bail!(message),
            None => anyhow::bail!("script is empty"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Generator that numbers each reply
struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str, _params: &SamplingParams) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("This is supportive reply number {} for you", n))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Instruction LLM that answers mood and refinement prompts separately
struct MockLlm {
    mood: Option<String>,
    refined: Option<String>,
    mood_calls: AtomicUsize,
    refine_calls: AtomicUsize,
}

impl MockLlm {
    /// `None` makes the corresponding call fail
    fn new(mood: Option<&str>, refined: Option<&str>) -> Self {
        Self {
            mood: mood.map(str::to_string),
            refined: refined.map(str::to_string),
            mood_calls: AtomicUsize::new(0),
            refine_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let reply = if request.prompt.contains("Classify the emotion") {
            self.mood_calls.fetch_add(1, Ordering::SeqCst);
            self.mood.clone()
        } else {
            self.refine_calls.fetch_add(1, Ordering::SeqCst);
            self.refined.clone()
        };

        match reply {
            Some(text) => Ok(CompletionResponse {
                text,
                model: "mock-model".to_string(),
                provider: "mock".to_string(),
            }),
            None => anyhow::bail!("mock LLM failure"),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}

/// Classifier that flags every message with a fixed assessment
struct FixedClassifier(CrisisAssessment);

impl CrisisClassifier for FixedClassifier {
    fn assess(&self, _message: &str) -> CrisisAssessment {
        self.0.clone()
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn pipeline(
    generator: Option<Arc<dyn TextGenerator>>,
    llm: Option<Arc<dyn LlmProvider>>,
) -> TurnPipeline {
    TurnPipeline::new(generator, llm)
}

#[tokio::test]
async fn test_crisis_message_escalates_with_resources() {
    let generator = Arc::new(ScriptedGenerator::always(
        "Please know that you are not alone in this.",
    ));
    let llm = Arc::new(MockLlm::new(
        Some("sad"),
        Some("hey, I'm really glad you told me. you matter."),
    ));
    let pipeline = pipeline(Some(generator), Some(llm.clone()));

    let (response, trace) = pipeline
        .process_turn_traced("I want to kill myself tonight", None)
        .await;

    assert!(response.crisis.detected);
    assert_eq!(response.crisis.crisis_type.as_deref(), Some("suicide"));
    assert_eq!(response.crisis.score, Some(0.9));

    let resources = response.crisis.resources.as_deref().unwrap();
    assert!(resources.contains("988"));

    assert!(response.final_text.starts_with(RESOURCE_BLOCK_HEADING));
    assert!(response
        .final_text
        .ends_with("\n\nhey, I'm really glad you told me. you matter."));

    assert_eq!(response.detected_mood, Some(MoodLabel::Sad));
    assert!(trace.visited(TurnStage::Refined));
    assert!(trace.visited(TurnStage::ResourceAttached));
    assert_eq!(trace.stages.last(), Some(&TurnStage::Complete));
    assert_eq!(llm.refine_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_low_confidence_crisis_attaches_resources_without_prefix() {
    let generator = Arc::new(ScriptedGenerator::always(
        "It takes courage to talk about these feelings.",
    ));
    let pipeline = pipeline(Some(generator), None);

    let response = pipeline.process_turn("sometimes I want to die", None).await;

    assert!(response.crisis.detected);
    assert_eq!(response.crisis.score, Some(0.7));
    assert!(response.crisis.resources.is_some());
    assert_eq!(
        response.final_text,
        "It takes courage to talk about these feelings."
    );
}

#[tokio::test]
async fn test_swapped_classifier_drives_escalation() {
    let generator = Arc::new(ScriptedGenerator::always(
        "Let's focus on keeping everyone safe right now.",
    ));
    let classifier = FixedClassifier(CrisisAssessment {
        is_crisis: true,
        categories: [CrisisCategory::Violence].into_iter().collect(),
        confidence: 0.85,
    });
    let pipeline = pipeline(Some(generator), None).with_classifier(Arc::new(classifier));

    assert_eq!(pipeline.classifier_name(), "fixed");

    // No keyword would match this message; the stub decides alone.
    let response = pipeline.process_turn("the weather is nice", None).await;

    assert!(response.crisis.detected);
    assert_eq!(response.crisis.crisis_type.as_deref(), Some("violence"));
    assert_eq!(response.crisis.score, Some(0.85));
    assert!(response
        .crisis
        .resources
        .as_deref()
        .unwrap()
        .contains("1-800-799-7233"));
    assert!(response.final_text.starts_with(RESOURCE_BLOCK_HEADING));
    assert!(response
        .final_text
        .ends_with("\n\nLet's focus on keeping everyone safe right now."));
}

#[tokio::test]
async fn test_happy_path_without_llm() {
    let generator = Arc::new(ScriptedGenerator::always(
        "That's wonderful to hear about your day!",
    ));
    let pipeline = pipeline(Some(generator.clone()), None);

    let (response, trace) = pipeline
        .process_turn_traced("I had a great day today!", None)
        .await;

    assert_eq!(response.final_text, "That's wonderful to hear about your day!");
    assert_eq!(response.detected_mood, None);
    assert!(!response.crisis.detected);
    assert_eq!(response.crisis.crisis_type, None);
    assert_eq!(response.crisis.score, None);
    assert_eq!(trace.attempt, Some(1));
    assert_eq!(generator.calls(), 1);
    assert!(!trace.visited(TurnStage::ResourceAttached));
    assert_eq!(pipeline.history().snapshot(), vec!["That's wonderful to hear about your day!"]);
}

#[tokio::test]
async fn test_happy_path_with_llm() {
    let generator = Arc::new(ScriptedGenerator::always(
        "That's wonderful to hear about your day!",
    ));
    let llm = Arc::new(MockLlm::new(
        Some("Happy"),
        Some("omg that's awesome! what made it so good?"),
    ));
    let pipeline = pipeline(Some(generator.clone()), Some(llm));

    let response = pipeline.process_turn("I had a great day today!", None).await;

    assert_eq!(response.detected_mood, Some(MoodLabel::Happy));
    assert_eq!(response.final_text, "omg that's awesome! what made it so good?");
    assert!(generator
        .last_prompt()
        .unwrap()
        .contains("User emotion: happy"));
}

#[tokio::test]
async fn test_unavailable_generator_returns_apology() {
    let llm = Arc::new(MockLlm::new(Some("anxious"), Some("unused")));
    let pipeline = pipeline(None, Some(llm.clone()));

    let (response, trace) = pipeline
        .process_turn_traced("I can't stop worrying", None)
        .await;

    assert_eq!(response.final_text, UNAVAILABLE_REPLY);
    assert_eq!(response.detected_mood, Some(MoodLabel::Anxious));
    assert_eq!(llm.refine_calls.load(Ordering::SeqCst), 0);
    assert!(!trace.visited(TurnStage::Refined));
    assert_eq!(trace.candidate_outcome, "unavailable");
}

#[tokio::test]
async fn test_short_output_falls_back_after_three_attempts() {
    let generator = Arc::new(ScriptedGenerator::always("I hear you."));
    let pipeline = pipeline(Some(generator.clone()), None);

    let (response, trace) = pipeline.process_turn_traced("my job", None).await;

    assert_eq!(generator.calls(), 3);
    assert_eq!(response.final_text, fallback_reply("my job"));
    assert_eq!(trace.candidate_outcome, "fallback");
    assert!(pipeline.history().is_empty());
}

#[tokio::test]
async fn test_five_words_is_too_short() {
    let generator = Arc::new(ScriptedGenerator::always("one two three four five"));
    let pipeline = pipeline(Some(generator), None);

    let response = pipeline.process_turn("hello", None).await;
    assert_eq!(response.final_text, fallback_reply("hello"));
}

#[tokio::test]
async fn test_repeated_reply_is_rejected_on_next_turn() {
    let generator = Arc::new(ScriptedGenerator::always(
        "Try to take things one small step at a time.",
    ));
    let pipeline = pipeline(Some(generator.clone()), None);

    let first = pipeline.process_turn("I'm overwhelmed", None).await;
    assert_eq!(first.final_text, "Try to take things one small step at a time.");

    let second = pipeline.process_turn("still overwhelmed", None).await;
    assert_eq!(second.final_text, fallback_reply("still overwhelmed"));
    assert_eq!(generator.calls(), 4);
    assert_eq!(pipeline.history().len(), 1);
}

#[tokio::test]
async fn test_retry_recovers_from_failed_attempt() {
    let generator = Arc::new(ScriptedGenerator::new(vec![
        Err("model server hiccup"),
        Ok("too short"),
        Ok("Talking about it is a really good first step."),
    ]));
    let pipeline = pipeline(Some(generator.clone()), None);

    let (response, trace) = pipeline.process_turn_traced("I feel stuck", None).await;

    assert_eq!(response.final_text, "Talking about it is a really good first step.");
    assert_eq!(trace.attempt, Some(3));
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_history_is_bounded_across_turns() {
    let mut config = Config::default();
    config.pipeline.similarity_threshold = 0.99;

    let generator = Arc::new(CountingGenerator {
        calls: AtomicUsize::new(0),
    });
    let pipeline = TurnPipeline::from_config(&config, Some(generator), None).unwrap();

    for turn in 0..8 {
        pipeline.process_turn(&format!("turn {}", turn), None).await;
        assert!(pipeline.history().len() <= 5);
    }

    let history = pipeline.history().snapshot();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0], "This is supportive reply number 3 for you");
    assert_eq!(history[4], "This is supportive reply number 7 for you");
}

#[tokio::test]
async fn test_refinement_failure_keeps_candidate() {
    let generator = Arc::new(ScriptedGenerator::always(
        "It is completely normal to feel nervous before exams.",
    ));
    let llm = Arc::new(MockLlm::new(Some("anxious"), None));
    let pipeline = pipeline(Some(generator), Some(llm));

    let response = pipeline.process_turn("exams tomorrow", None).await;
    assert_eq!(
        response.final_text,
        "It is completely normal to feel nervous before exams."
    );
}

#[tokio::test]
async fn test_blank_refinement_keeps_candidate() {
    let generator = Arc::new(ScriptedGenerator::always(
        "It is completely normal to feel nervous before exams.",
    ));
    let llm = Arc::new(MockLlm::new(Some("anxious"), Some("   ")));
    let pipeline = pipeline(Some(generator), Some(llm));

    let response = pipeline.process_turn("exams tomorrow", None).await;
    assert_eq!(
        response.final_text,
        "It is completely normal to feel nervous before exams."
    );
}

#[tokio::test]
async fn test_mood_absent_when_llm_fails_uses_client_emotion() {
    let llm = Arc::new(MockLlm::new(None, None));
    let pipeline = pipeline(None, Some(llm));

    let with_report = pipeline.process_turn("meh", Some("Sad")).await;
    assert_eq!(with_report.detected_mood, Some(MoodLabel::Sad));

    let without_report = pipeline.process_turn("meh", None).await;
    assert_eq!(without_report.detected_mood, None);

    let unknown_report = pipeline.process_turn("meh", Some("grumpy")).await;
    assert_eq!(unknown_report.detected_mood, None);
}

#[tokio::test]
async fn test_unrecognized_mood_is_neutral() {
    let llm = Arc::new(MockLlm::new(Some("hmm, hard to say"), None));
    let pipeline = pipeline(None, Some(llm));

    // Neutral is a real answer, so the client report is not consulted
    let response = pipeline.process_turn("ok", Some("happy")).await;
    assert_eq!(response.detected_mood, Some(MoodLabel::Neutral));
}

#[tokio::test]
async fn test_generation_timeout_counts_as_failed_attempt() {
    let generator = Arc::new(ScriptedGenerator::slow(
        "This reply arrives much too late to be used.",
        Duration::from_millis(200),
    ));
    let guard = Arc::new(RepetitionGuard::default());
    let candidates = CandidateGenerator::new(Some(generator.clone()), guard, Duration::from_millis(20));

    let outcome = candidates.generate("hello", None).await;

    assert_eq!(outcome, CandidateOutcome::Fallback(fallback_reply("hello")));
    assert_eq!(generator.calls(), 3);
}
