//! Workflow pattern table and trigger matching.

use std::collections::{BTreeMap, BTreeSet};

use haven_core::{MatchStrategy, Priority};
use serde::Serialize;

/// Static mapping from trigger action tags to the resources they predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowPattern {
    pub id: &'static str,
    pub name: &'static str,
    pub priority: Priority,
    pub resource_keys: &'static [&'static str],
    pub trigger_actions: &'static [&'static str],
}

impl WorkflowPattern {
    /// Whether `action` triggers this pattern.
    ///
    /// An empty action never matches, under either strategy.
    pub fn matches(&self, action: &str, strategy: MatchStrategy) -> bool {
        if action.is_empty() {
            return false;
        }
        match strategy {
            MatchStrategy::Exact => self.trigger_actions.contains(&action),
            MatchStrategy::Substring => self
                .trigger_actions
                .iter()
                .any(|trigger| action.contains(trigger) || trigger.contains(action)),
        }
    }
}

/// Id of the pattern whose resources back crisis preloading.
pub const CRISIS_PATTERN_ID: &str = "crisis-support";

/// Resources preloaded when time-constraint mode is enabled.
pub const ESSENTIAL_RESOURCES: &[&str] = &["crisis-hotlines", "emergency-contacts", "safety-plan"];

pub static DEFAULT_PATTERNS: &[WorkflowPattern] = &[
    WorkflowPattern {
        id: CRISIS_PATTERN_ID,
        name: "Crisis Support",
        priority: Priority::Critical,
        resource_keys: &[
            "crisis-hotlines",
            "emergency-contacts",
            "safety-plan",
            "grounding-techniques",
        ],
        trigger_actions: &[
            "crisis_button_click",
            "emergency_contact_view",
            "hotline_search",
            "safety_plan_open",
        ],
    },
    WorkflowPattern {
        id: "grief-support",
        name: "Grief Support",
        priority: Priority::Important,
        resource_keys: &["grief-counseling", "support-groups", "grief-articles"],
        trigger_actions: &[
            "grief_resources_view",
            "loss_support_search",
            "memorial_page_view",
        ],
    },
    WorkflowPattern {
        id: "provider-search",
        name: "Provider Search",
        priority: Priority::Important,
        resource_keys: &["provider-directory", "insurance-info", "location-data"],
        trigger_actions: &["find_provider", "provider_search", "insurance_check"],
    },
    WorkflowPattern {
        id: "assessment-flow",
        name: "Assessment Flow",
        priority: Priority::Important,
        resource_keys: &["assessment-forms", "scoring-guides", "result-explanations"],
        trigger_actions: &["assessment_start", "screening_begin", "questionnaire_open"],
    },
    WorkflowPattern {
        id: "self-care",
        name: "Self Care",
        priority: Priority::NiceToHave,
        resource_keys: &["meditation-audio", "journal-prompts", "wellness-tips"],
        trigger_actions: &["meditation_start", "journal_open", "wellness_check"],
    },
];

/// Look up a pattern by id.
pub fn find_pattern<'a>(patterns: &'a [WorkflowPattern], id: &str) -> Option<&'a WorkflowPattern> {
    patterns.iter().find(|p| p.id == id)
}

/// Every pattern `action` triggers, in table order.
pub fn match_patterns<'a>(
    patterns: &'a [WorkflowPattern],
    action: &str,
    strategy: MatchStrategy,
) -> Vec<&'a WorkflowPattern> {
    patterns
        .iter()
        .filter(|p| p.matches(action, strategy))
        .collect()
}

/// Group the resources of matched patterns into preload tiers.
///
/// A key named by several patterns lands only in the highest of their tiers.
/// Nice-to-have patterns are not proactively preloaded.
pub fn preload_tiers(matched: &[&WorkflowPattern]) -> BTreeMap<Priority, BTreeSet<String>> {
    let mut highest: BTreeMap<&str, Priority> = BTreeMap::new();
    for pattern in matched {
        for key in pattern.resource_keys.iter().copied() {
            let tier = highest.entry(key).or_insert(pattern.priority);
            *tier = (*tier).max(pattern.priority);
        }
    }

    let mut tiers: BTreeMap<Priority, BTreeSet<String>> = BTreeMap::new();
    for (key, priority) in highest {
        if priority == Priority::NiceToHave {
            continue;
        }
        tiers.entry(priority).or_default().insert(key.to_string());
    }
    tiers
}
