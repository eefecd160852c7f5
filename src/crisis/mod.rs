// Crisis detection module
// Keyword risk scoring and helpline resources

mod detector;
mod resources;

pub use detector::{
    CrisisAssessment, CrisisCategory, CrisisClassifier, CrisisKeywords, KeywordCrisisClassifier,
    BASE_CONFIDENCE, IMMEDIATE_DANGER_CONFIDENCE,
};
pub use resources::{CrisisResourceResolver, RESOURCE_BLOCK_HEADING};
