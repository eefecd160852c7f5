// Crisis keyword detector
//
// High-precision, low-recall heuristic: a message is only flagged when it
// contains one of the configured phrases. Anything phrased differently is
// missed, which is why the classifier sits behind `CrisisClassifier`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Confidence for any keyword match
pub const BASE_CONFIDENCE: f64 = 0.7;

/// Confidence when the message also signals immediate danger
pub const IMMEDIATE_DANGER_CONFIDENCE: f64 = 0.9;

/// Fixed crisis taxonomy, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisCategory {
    Suicide,
    SelfHarm,
    Violence,
    ImmediateDanger,
}

impl CrisisCategory {
    pub const ALL: [CrisisCategory; 4] = [
        CrisisCategory::Suicide,
        CrisisCategory::SelfHarm,
        CrisisCategory::Violence,
        CrisisCategory::ImmediateDanger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrisisCategory::Suicide => "suicide",
            CrisisCategory::SelfHarm => "self_harm",
            CrisisCategory::Violence => "violence",
            CrisisCategory::ImmediateDanger => "immediate_danger",
        }
    }
}

impl fmt::Display for CrisisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scanning one message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisAssessment {
    pub is_crisis: bool,
    pub categories: BTreeSet<CrisisCategory>,
    pub confidence: f64,
}

impl CrisisAssessment {
    /// Assessment for a message with no risk indicators
    pub fn none() -> Self {
        Self {
            is_crisis: false,
            categories: BTreeSet::new(),
            confidence: 0.0,
        }
    }

    /// Build an assessment from matched categories, keeping the invariants
    /// (`is_crisis` iff categories non-empty, confidence in [0, 1]).
    pub fn from_categories(categories: BTreeSet<CrisisCategory>) -> Self {
        let confidence = if categories.is_empty() {
            0.0
        } else if categories.contains(&CrisisCategory::ImmediateDanger) {
            IMMEDIATE_DANGER_CONFIDENCE
        } else {
            BASE_CONFIDENCE
        };

        Self {
            is_crisis: !categories.is_empty(),
            categories,
            confidence,
        }
    }

    /// Highest-priority category present
    pub fn primary_category(&self) -> Option<CrisisCategory> {
        self.categories.iter().next().copied()
    }

    pub fn contains(&self, category: CrisisCategory) -> bool {
        self.categories.contains(&category)
    }
}

/// Strategy for judging crisis risk in a message
pub trait CrisisClassifier: Send + Sync {
    /// Scan a message. Must never fail.
    fn assess(&self, message: &str) -> CrisisAssessment;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Keyword table, one list per category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisKeywords {
    pub suicide: Vec<String>,
    pub self_harm: Vec<String>,
    pub violence: Vec<String>,
    pub immediate_danger: Vec<String>,
    /// Temporal qualifiers ("tonight", "right now"). They never flag a
    /// message on their own; alongside another category they count as
    /// immediate danger. Broad words such as "today" are left out since they
    /// also appear in past-tense reports ("I was suicidal last year but today
    /// I'm better").
    #[serde(default)]
    pub urgency_markers: Vec<String>,
}

fn phrases(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for CrisisKeywords {
    fn default() -> Self {
        Self {
            suicide: phrases(&[
                "suicide",
                "suicidal",
                "kill myself",
                "end my life",
                "take my own life",
                "want to die",
                "better off dead",
                "no reason to live",
                "don't want to be alive",
                "end it all",
            ]),
            self_harm: phrases(&[
                "self harm",
                "self-harm",
                "cut myself",
                "cutting myself",
                "hurt myself",
                "hurting myself",
                "burn myself",
                "starve myself",
            ]),
            violence: phrases(&[
                "kill someone",
                "kill him",
                "kill her",
                "kill them",
                "hurt someone",
                "hurt somebody",
                "hurt them",
                "shoot someone",
                "violent thoughts",
            ]),
            immediate_danger: phrases(&[
                "have a gun",
                "got a gun",
                "loaded gun",
                "took pills",
                "taken pills",
                "overdose",
                "on the ledge",
                "on the bridge",
                "goodbye forever",
                "final goodbye",
                "this is my last message",
            ]),
            urgency_markers: phrases(&["tonight", "right now", "going to do it"]),
        }
    }
}

impl CrisisKeywords {
    /// Category lists in priority order
    fn table(&self) -> [(CrisisCategory, &[String]); 4] {
        [
            (CrisisCategory::Suicide, self.suicide.as_slice()),
            (CrisisCategory::SelfHarm, self.self_harm.as_slice()),
            (CrisisCategory::Violence, self.violence.as_slice()),
            (CrisisCategory::ImmediateDanger, self.immediate_danger.as_slice()),
        ]
    }
}

/// First keyword from `list` that occurs in the already-lowercased text
fn find_keyword<'a>(lowered: &str, list: &'a [String]) -> Option<&'a str> {
    list.iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .find(|k| lowered.contains(&k.to_lowercase()))
}

/// Case-insensitive substring classifier over a fixed keyword table
#[derive(Debug, Clone, Default)]
pub struct KeywordCrisisClassifier {
    keywords: CrisisKeywords,
}

impl KeywordCrisisClassifier {
    pub fn new(keywords: CrisisKeywords) -> Self {
        Self { keywords }
    }

    /// Load crisis keywords from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read crisis keywords file: {}", path.display()))?;

        let keywords: CrisisKeywords = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Self { keywords })
    }

    pub fn keywords(&self) -> &CrisisKeywords {
        &self.keywords
    }
}

impl CrisisClassifier for KeywordCrisisClassifier {
    fn assess(&self, message: &str) -> CrisisAssessment {
        let lowered = message.to_lowercase();
        let mut categories = BTreeSet::new();

        for (category, list) in self.keywords.table() {
            if let Some(keyword) = find_keyword(&lowered, list) {
                tracing::warn!(category = %category, keyword, "Crisis keyword matched");
                categories.insert(category);
            }
        }

        if !categories.is_empty() {
            if let Some(marker) = find_keyword(&lowered, &self.keywords.urgency_markers) {
                tracing::warn!(marker, "Urgency marker alongside crisis keyword");
                categories.insert(CrisisCategory::ImmediateDanger);
            }
        }

        CrisisAssessment::from_categories(categories)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
