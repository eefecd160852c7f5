// Turn result types

use serde::Serialize;

use super::mood::MoodLabel;
use crate::crisis::CrisisAssessment;

/// Crisis section of a turn response
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrisisReport {
    pub detected: bool,
    /// Primary category, when detected
    #[serde(rename = "type")]
    pub crisis_type: Option<String>,
    /// Classifier confidence, when detected
    pub score: Option<f64>,
    /// Newline-separated helpline resources, when attached
    pub resources: Option<String>,
}

impl CrisisReport {
    pub fn from_assessment(assessment: &CrisisAssessment) -> Self {
        if !assessment.is_crisis {
            return Self::default();
        }

        Self {
            detected: true,
            crisis_type: assessment.primary_category().map(|c| c.as_str().to_string()),
            score: Some(assessment.confidence),
            resources: None,
        }
    }
}

/// Everything the caller sees for one chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResponse {
    #[serde(rename = "response")]
    pub final_text: String,
    pub detected_mood: Option<MoodLabel>,
    pub crisis: CrisisReport,
}

/// Stages of one turn, in the only order they can be visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    Received,
    MoodResolved,
    CrisisAssessed,
    CandidateGenerated,
    Refined,
    ResourceAttached,
    Complete,
}

/// Diagnostics for one turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnTrace {
    pub turn_id: String,
    pub candidate: String,
    /// "accepted", "fallback" or "unavailable"
    pub candidate_outcome: &'static str,
    /// 1-based attempt that produced an accepted candidate
    pub attempt: Option<usize>,
    pub stages: Vec<TurnStage>,
}

impl TurnTrace {
    pub(super) fn new(turn_id: String) -> Self {
        Self {
            turn_id,
            candidate: String::new(),
            candidate_outcome: "unavailable",
            attempt: None,
            stages: vec![TurnStage::Received],
        }
    }

    pub(super) fn enter(&mut self, stage: TurnStage) {
        debug_assert!(self.stages.last().map_or(true, |last| *last < stage));
        self.stages.push(stage);
    }

    pub fn visited(&self, stage: TurnStage) -> bool {
        self.stages.contains(&stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crisis::{CrisisCategory, CrisisClassifier, KeywordCrisisClassifier};
    use std::collections::BTreeSet;

    #[test]
    fn test_report_without_crisis() {
        let report = CrisisReport::from_assessment(&CrisisAssessment::none());
        assert_eq!(report, CrisisReport::default());
    }

    #[test]
    fn test_report_uses_primary_category() {
        let categories: BTreeSet<_> = [CrisisCategory::ImmediateDanger, CrisisCategory::SelfHarm]
            .into_iter()
            .collect();
        let report = CrisisReport::from_assessment(&CrisisAssessment::from_categories(categories));
        assert!(report.detected);
        assert_eq!(report.crisis_type.as_deref(), Some("self_harm"));
        assert_eq!(report.score, Some(0.9));
        assert_eq!(report.resources, None);
    }

    #[test]
    fn test_response_wire_names() {
        let assessment = KeywordCrisisClassifier::default().assess("I want to end my life");
        let response = TurnResponse {
            final_text: "hey".to_string(),
            detected_mood: Some(MoodLabel::Sad),
            crisis: CrisisReport::from_assessment(&assessment),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["response"], "hey");
        assert_eq!(json["detected_mood"], "sad");
        assert_eq!(json["crisis"]["detected"], true);
        assert_eq!(json["crisis"]["type"], "suicide");
        assert!(json["crisis"]["resources"].is_null());
    }

    #[test]
    fn test_stage_order() {
        assert!(TurnStage::Received < TurnStage::MoodResolved);
        assert!(TurnStage::Refined < TurnStage::ResourceAttached);
        assert!(TurnStage::ResourceAttached < TurnStage::Complete);
    }
}
