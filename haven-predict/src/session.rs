//! Per-session behavioral state.

use std::collections::VecDeque;
use std::time::Duration;

use haven_core::{elapsed_between, StressLevel, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tracked user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: String,
    pub context: Option<serde_json::Value>,
    pub recorded_at: Timestamp,
    pub stress_indicator: bool,
}

/// State of one application session. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub start_time: Timestamp,
    pub stress_level: StressLevel,
    /// Most recent actions, oldest first.
    pub action_history: VecDeque<ActionRecord>,
    pub time_constrained: bool,
    /// Actions tracked over the whole session, including ones aged out of the history.
    pub actions_tracked: u64,
}

impl Session {
    pub fn new(start_time: Timestamp) -> Self {
        Self {
            id: Uuid::now_v7(),
            start_time,
            stress_level: StressLevel::Low,
            action_history: VecDeque::new(),
            time_constrained: false,
            actions_tracked: 0,
        }
    }

    /// Append an action, keeping at most `limit` entries.
    pub fn record(&mut self, record: ActionRecord, limit: usize) {
        self.actions_tracked += 1;
        self.action_history.push_back(record);
        while self.action_history.len() > limit.max(1) {
            self.action_history.pop_front();
        }
    }

    pub fn duration(&self, now: Timestamp) -> Duration {
        elapsed_between(self.start_time, now)
    }

    pub fn last_action(&self) -> Option<&ActionRecord> {
        self.action_history.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record(action: &str) -> ActionRecord {
        ActionRecord {
            action: action.to_string(),
            context: None,
            recorded_at: DateTime::UNIX_EPOCH,
            stress_indicator: false,
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = Session::new(DateTime::UNIX_EPOCH);
        for i in 0..7 {
            session.record(record(&format!("view_{}", i)), 3);
        }
        let kept: Vec<&str> = session
            .action_history
            .iter()
            .map(|r| r.action.as_str())
            .collect();
        assert_eq!(kept, vec!["view_4", "view_5", "view_6"]);
        assert_eq!(session.actions_tracked, 7);
        assert_eq!(session.last_action().unwrap().action, "view_6");
    }

    #[test]
    fn test_duration() {
        let start = DateTime::UNIX_EPOCH;
        let session = Session::new(start);
        let later = start + chrono::Duration::minutes(12);
        assert_eq!(session.duration(later), Duration::from_secs(720));
        assert_eq!(session.duration(start - chrono::Duration::seconds(1)), Duration::ZERO);
    }

    #[test]
    fn test_new_sessions_have_distinct_ids() {
        let a = Session::new(DateTime::UNIX_EPOCH);
        let b = Session::new(DateTime::UNIX_EPOCH);
        assert_ne!(a.id, b.id);
        assert_eq!(a.stress_level, StressLevel::Low);
        assert!(!a.time_constrained);
    }
}
