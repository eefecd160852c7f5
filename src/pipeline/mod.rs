// Chat turn pipeline
//
// message -> mood + crisis -> candidate -> refinement -> resources -> response
//
// Every stage degrades to a fallback value; only a missing generation model
// ends a turn early (with the static apology).

use anyhow::Result;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

mod candidate;
mod mood;
mod refiner;
mod repetition;
mod types;

pub use candidate::{fallback_reply, CandidateGenerator, CandidateOutcome, UNAVAILABLE_REPLY};
pub use mood::{MoodClassifier, MoodLabel};
pub use refiner::ResponseRefiner;
pub use repetition::{sequence_similarity, RepetitionGuard};
pub use types::{CrisisReport, TurnResponse, TurnStage, TurnTrace};

use crate::config::Config;
use crate::crisis::{CrisisClassifier, CrisisResourceResolver, KeywordCrisisClassifier};
use crate::generators::TextGenerator;
use crate::providers::LlmProvider;

/// Owns every stage of a chat turn
///
/// Capabilities are resolved once by the caller and held for the pipeline's
/// lifetime. The repetition history is the only state shared across turns.
pub struct TurnPipeline {
    classifier: Arc<dyn CrisisClassifier>,
    mood: MoodClassifier,
    candidates: CandidateGenerator,
    refiner: ResponseRefiner,
    resources: CrisisResourceResolver,
    escalation_threshold: f64,
    llm_available: bool,
}

impl TurnPipeline {
    /// Pipeline with default tuning and a fresh history
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        let config = Config::default();
        Self::assemble(
            &config,
            Arc::new(KeywordCrisisClassifier::default()),
            generator,
            llm,
        )
    }

    /// Pipeline tuned from configuration
    ///
    /// Fails only when a configured crisis keyword file cannot be loaded.
    pub fn from_config(
        config: &Config,
        generator: Option<Arc<dyn TextGenerator>>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Self> {
        let classifier = match &config.pipeline.crisis_keywords_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading crisis keywords");
                KeywordCrisisClassifier::load_from_file(path)?
            }
            None => KeywordCrisisClassifier::default(),
        };

        Ok(Self::assemble(config, Arc::new(classifier), generator, llm))
    }

    fn assemble(
        config: &Config,
        classifier: Arc<dyn CrisisClassifier>,
        generator: Option<Arc<dyn TextGenerator>>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let guard = Arc::new(RepetitionGuard::new(
            config.pipeline.history_capacity,
            config.pipeline.similarity_threshold,
        ));

        let candidates = CandidateGenerator::new(generator, guard, config.generator.timeout())
            .with_limits(config.generator.max_attempts, config.generator.min_words);

        Self {
            classifier,
            mood: MoodClassifier::new(llm.clone(), config.llm.timeout()),
            candidates,
            refiner: ResponseRefiner::new(llm.clone(), config.llm.timeout()),
            resources: CrisisResourceResolver::default(),
            escalation_threshold: config.pipeline.escalation_threshold,
            llm_available: llm.is_some(),
        }
    }

    /// Swap the crisis strategy
    pub fn with_classifier(mut self, classifier: Arc<dyn CrisisClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn generation_available(&self) -> bool {
        self.candidates.is_available()
    }

    pub fn llm_available(&self) -> bool {
        self.llm_available
    }

    pub fn history(&self) -> &RepetitionGuard {
        self.candidates.guard()
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Process one chat turn
    pub async fn process_turn(&self, message: &str, client_emotion: Option<&str>) -> TurnResponse {
        self.process_turn_traced(message, client_emotion).await.0
    }

    /// Process one chat turn and report how it went
    pub async fn process_turn_traced(
        &self,
        message: &str,
        client_emotion: Option<&str>,
    ) -> (TurnResponse, TurnTrace) {
        let turn_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("turn", turn_id = %turn_id);
        self.run(message, client_emotion, TurnTrace::new(turn_id))
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        message: &str,
        client_emotion: Option<&str>,
        mut trace: TurnTrace,
    ) -> (TurnResponse, TurnTrace) {
        let detected_mood = match self.mood.classify(message).await {
            Some(mood) => Some(mood),
            None => client_emotion.and_then(MoodLabel::from_client_report),
        };
        trace.enter(TurnStage::MoodResolved);

        let assessment = self.classifier.assess(message);
        let mut crisis = CrisisReport::from_assessment(&assessment);
        trace.enter(TurnStage::CrisisAssessed);

        let outcome = self.candidates.generate(message, detected_mood).await;
        trace.enter(TurnStage::CandidateGenerated);
        trace.candidate = outcome.text().to_string();
        trace.candidate_outcome = outcome.kind();
        if let CandidateOutcome::Accepted { attempt, .. } = &outcome {
            trace.attempt = Some(*attempt);
        }

        if outcome.is_unavailable() {
            trace.enter(TurnStage::Complete);
            let response = TurnResponse {
                final_text: outcome.text().to_string(),
                detected_mood,
                crisis,
            };
            return (response, trace);
        }

        let mut final_text = self
            .refiner
            .refine(message, outcome.text(), detected_mood, &assessment)
            .await;
        trace.enter(TurnStage::Refined);

        if assessment.is_crisis {
            let bundle = self.resources.resolve(&assessment.categories);
            if !bundle.is_empty() {
                if assessment.confidence > self.escalation_threshold {
                    tracing::warn!(
                        confidence = assessment.confidence,
                        "Escalating reply with crisis resources"
                    );
                    final_text = format!(
                        "{}\n\n{}",
                        CrisisResourceResolver::format_block(&bundle),
                        final_text
                    );
                }
                crisis.resources = Some(bundle.join("\n"));
                trace.enter(TurnStage::ResourceAttached);
            }
        }

        trace.enter(TurnStage::Complete);
        tracing::info!(
            mood = detected_mood.map(|m| m.as_str()),
            crisis = crisis.detected,
            candidate = trace.candidate_outcome,
            "Turn complete"
        );

        let response = TurnResponse {
            final_text,
            detected_mood,
            crisis,
        };
        (response, trace)
    }
}
