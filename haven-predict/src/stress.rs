//! Rolling stress classification.
//!
//! The estimator keeps the most recent `window` tracked actions and counts
//! how many of them are stress-indicating tags. The level is a pure function
//! of that count, so it can fall again as calmer actions push stress tags
//! out of the window.

use std::collections::VecDeque;

use haven_core::constants::DEFAULT_STRESS_WINDOW;
use haven_core::StressLevel;
use serde::{Deserialize, Serialize};

/// Action tags that indicate user stress.
pub const STRESS_INDICATORS: &[&str] = &[
    "rapid_navigation",
    "repeated_back_navigation",
    "form_abandoned",
    "crisis_button_click",
    "help_search",
    "error_encountered",
    "session_timeout_warning",
];

pub fn is_stress_indicator(action: &str) -> bool {
    STRESS_INDICATORS.contains(&action)
}

/// Level change produced by one observed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressTransition {
    pub from: StressLevel,
    pub to: StressLevel,
}

impl StressTransition {
    /// Rose into `High` or `Crisis`. Each such step triggers one crisis preload.
    pub fn escalated(&self) -> bool {
        self.to > self.from && self.to.is_elevated()
    }

    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Rolling-window stress classifier.
#[derive(Debug, Clone)]
pub struct StressLevelEstimator {
    window: VecDeque<bool>,
    capacity: usize,
    level: StressLevel,
}

impl Default for StressLevelEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_STRESS_WINDOW)
    }
}

impl StressLevelEstimator {
    /// `window` is clamped to at least one action.
    pub fn new(window: usize) -> Self {
        let capacity = window.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            level: StressLevel::Low,
        }
    }

    pub fn level(&self) -> StressLevel {
        self.level
    }

    pub fn window_size(&self) -> usize {
        self.capacity
    }

    /// Stress-indicating actions currently inside the window.
    pub fn indicator_count(&self) -> usize {
        self.window.iter().filter(|stressed| **stressed).count()
    }

    /// Push one action and reclassify.
    pub fn observe(&mut self, action: &str) -> StressTransition {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(is_stress_indicator(action));

        let from = self.level;
        self.level = StressLevel::from_indicator_count(self.indicator_count());
        StressTransition {
            from,
            to: self.level,
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.level = StressLevel::Low;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_test_utils::generators::arb_action_sequence;
    use proptest::prelude::*;

    #[test]
    fn test_thresholds_climb_to_crisis() {
        let mut estimator = StressLevelEstimator::default();
        let levels: Vec<StressLevel> = (0..4)
            .map(|_| estimator.observe("rapid_navigation").to)
            .collect();
        assert_eq!(
            levels,
            vec![
                StressLevel::Moderate,
                StressLevel::High,
                StressLevel::High,
                StressLevel::Crisis,
            ]
        );
    }

    #[test]
    fn test_escalation_only_into_elevated_levels() {
        let mut estimator = StressLevelEstimator::default();
        let escalations: Vec<bool> = (0..5)
            .map(|_| estimator.observe("help_search").escalated())
            .collect();
        assert_eq!(escalations, vec![false, true, false, true, false]);
    }

    #[test]
    fn test_level_falls_as_window_slides() {
        let mut estimator = StressLevelEstimator::default();
        for _ in 0..4 {
            estimator.observe("form_abandoned");
        }
        assert_eq!(estimator.level(), StressLevel::Crisis);

        let mut transitions = Vec::new();
        for _ in 0..5 {
            transitions.push(estimator.observe("view_home").to);
        }
        assert_eq!(
            transitions,
            vec![
                StressLevel::Crisis,
                StressLevel::High,
                StressLevel::High,
                StressLevel::Moderate,
                StressLevel::Low,
            ]
        );
        assert_eq!(estimator.indicator_count(), 0);
    }

    #[test]
    fn test_non_indicators_are_ignored() {
        let mut estimator = StressLevelEstimator::new(3);
        let transition = estimator.observe("meditation_start");
        assert!(!transition.changed());
        assert_eq!(estimator.level(), StressLevel::Low);
        assert!(!is_stress_indicator("rapid"));
        assert!(is_stress_indicator("session_timeout_warning"));
    }

    #[test]
    fn test_reset() {
        let mut estimator = StressLevelEstimator::default();
        estimator.observe("error_encountered");
        estimator.reset();
        assert_eq!(estimator.level(), StressLevel::Low);
        assert_eq!(estimator.indicator_count(), 0);
    }

    #[test]
    fn test_zero_window_is_clamped() {
        let mut estimator = StressLevelEstimator::new(0);
        assert_eq!(estimator.window_size(), 1);
        assert_eq!(estimator.observe("help_search").to, StressLevel::Moderate);
        assert_eq!(estimator.observe("view_faq").to, StressLevel::Low);
    }

    proptest! {
        #[test]
        fn prop_level_matches_tail_count(actions in arb_action_sequence(STRESS_INDICATORS, 40)) {
            let mut estimator = StressLevelEstimator::default();
            for action in &actions {
                estimator.observe(action);
            }
            let tail = actions.iter().rev().take(DEFAULT_STRESS_WINDOW);
            let count = tail.filter(|a| is_stress_indicator(a)).count();
            prop_assert_eq!(estimator.level(), StressLevel::from_indicator_count(count));
        }

        #[test]
        fn prop_escalations_never_exceed_rises(actions in arb_action_sequence(STRESS_INDICATORS, 40)) {
            let mut estimator = StressLevelEstimator::default();
            for action in &actions {
                let t = estimator.observe(action);
                if t.escalated() {
                    prop_assert!(t.to > t.from);
                    prop_assert!(t.to >= StressLevel::High);
                }
            }
        }
    }
}
