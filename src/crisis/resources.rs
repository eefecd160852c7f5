// Crisis helpline resources
//
// Static lists; specialized entries for the detected categories come first,
// then the general baseline, with exact duplicates removed.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::detector::CrisisCategory;

/// Heading placed above the resource list in escalated replies
pub const RESOURCE_BLOCK_HEADING: &str =
    "It sounds like you might be going through something really serious. Please reach out for support right now:";

/// Categories with specialized lists, in output order
const SPECIALIZED_ORDER: [CrisisCategory; 3] = [
    CrisisCategory::Suicide,
    CrisisCategory::SelfHarm,
    CrisisCategory::Violence,
];

fn entries(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Maps crisis categories to helpline resources
#[derive(Debug, Clone)]
pub struct CrisisResourceResolver {
    general: Vec<String>,
    specialized: BTreeMap<CrisisCategory, Vec<String>>,
}

impl Default for CrisisResourceResolver {
    fn default() -> Self {
        let general = entries(&[
            "If you are in immediate danger, call 911 (US) or your local emergency number.",
            "988 Suicide & Crisis Lifeline: call or text 988 (US), available 24/7.",
            "Crisis Text Line: text HOME to 741741 (US).",
            "Find a helpline outside the US: https://findahelpline.com",
        ]);

        let mut specialized = BTreeMap::new();
        specialized.insert(
            CrisisCategory::Suicide,
            entries(&[
                "988 Suicide & Crisis Lifeline: call or text 988 (US), available 24/7.",
                "Chat with the 988 Lifeline online: https://988lifeline.org/chat",
            ]),
        );
        specialized.insert(
            CrisisCategory::SelfHarm,
            entries(&[
                "Crisis Text Line: text HOME to 741741 (US).",
                "Self-Injury Outreach & Support: https://sioutreach.org",
            ]),
        );
        specialized.insert(
            CrisisCategory::Violence,
            entries(&[
                "If anyone is at risk of being hurt, call 911 (US) or your local emergency number.",
                "National Domestic Violence Hotline: 1-800-799-7233, or text START to 88788.",
            ]),
        );

        Self {
            general,
            specialized,
        }
    }
}

impl CrisisResourceResolver {
    pub fn new(general: Vec<String>, specialized: BTreeMap<CrisisCategory, Vec<String>>) -> Self {
        Self {
            general,
            specialized,
        }
    }

    /// Resources for a set of categories, specialized first, no duplicates
    pub fn resolve(&self, categories: &BTreeSet<CrisisCategory>) -> Vec<String> {
        let specialized = SPECIALIZED_ORDER
            .iter()
            .filter(|category| categories.contains(*category))
            .filter_map(|category| self.specialized.get(category))
            .flatten();

        let mut seen = HashSet::new();
        let mut bundle = Vec::new();
        for entry in specialized.chain(self.general.iter()) {
            if seen.insert(entry.as_str()) {
                bundle.push(entry.clone());
            }
        }
        bundle
    }

    /// Render resources as the block shown ahead of an escalated reply
    pub fn format_block(resources: &[String]) -> String {
        let mut block = String::from(RESOURCE_BLOCK_HEADING);
        for entry in resources {
            block.push_str("\n• ");
            block.push_str(entry);
        }
        block
    }
}
