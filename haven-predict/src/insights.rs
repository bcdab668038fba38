//! Session summary for host applications.

use std::time::Duration;

use haven_core::{Connectivity, StressLevel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sessions longer than this get a break suggestion.
const LONG_SESSION: Duration = Duration::from_secs(45 * 60);

/// Snapshot returned by `WorkflowPredictor::get_workflow_insights`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInsights {
    pub session_id: Uuid,
    pub session_duration: Duration,
    pub stress_level: StressLevel,
    /// Number of distinct resources predicted this session.
    pub predicted_needs: usize,
    pub actions_tracked: u64,
    pub time_constrained: bool,
    pub recommendations: Vec<String>,
}

/// Inputs to [`recommendations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsightSignals {
    pub stress_level: StressLevel,
    pub time_constrained: bool,
    pub predicted_needs: usize,
    pub session_duration: Duration,
    pub connectivity: Connectivity,
}

/// Free-text guidance for the host UI, most urgent first.
pub fn recommendations(signals: &InsightSignals) -> Vec<String> {
    let mut out = Vec::new();

    match signals.stress_level {
        StressLevel::Crisis => {
            out.push("Show crisis hotlines and emergency contacts immediately".to_string());
            out.push("Keep the safety plan one tap away".to_string());
        }
        StressLevel::High => {
            out.push("Offer grounding techniques and quick access to crisis support".to_string());
        }
        StressLevel::Moderate => {
            out.push("Simplify navigation and surface help options".to_string());
        }
        StressLevel::Low => {}
    }

    if signals.time_constrained {
        out.push("Time-constrained: show essential resources only".to_string());
    }
    if !signals.connectivity.is_online() {
        out.push("Offline: serving cached offline copies".to_string());
    }
    if signals.predicted_needs == 0 {
        out.push("Not enough activity yet to predict needs".to_string());
    } else {
        out.push(format!(
            "{} predicted resources are being kept warm",
            signals.predicted_needs
        ));
    }
    if signals.session_duration >= LONG_SESSION && signals.stress_level <= StressLevel::Moderate {
        out.push("Long session: suggest a break or a self-care exercise".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm() -> InsightSignals {
        InsightSignals {
            stress_level: StressLevel::Low,
            time_constrained: false,
            predicted_needs: 0,
            session_duration: Duration::from_secs(60),
            connectivity: Connectivity::Online,
        }
    }

    #[test]
    fn test_calm_session() {
        assert_eq!(
            recommendations(&calm()),
            vec!["Not enough activity yet to predict needs".to_string()]
        );
    }

    #[test]
    fn test_crisis_recommendations_come_first() {
        let signals = InsightSignals {
            stress_level: StressLevel::Crisis,
            time_constrained: true,
            predicted_needs: 4,
            connectivity: Connectivity::Offline,
            ..calm()
        };
        let recs = recommendations(&signals);
        assert!(recs[0].contains("crisis hotlines"));
        assert!(recs.iter().any(|r| r.starts_with("Time-constrained")));
        assert!(recs.iter().any(|r| r.starts_with("Offline")));
        assert!(recs.iter().any(|r| r.starts_with("4 predicted")));
    }

    #[test]
    fn test_long_session_break_only_when_calm() {
        let long = InsightSignals {
            session_duration: Duration::from_secs(3600),
            ..calm()
        };
        assert!(recommendations(&long)
            .iter()
            .any(|r| r.starts_with("Long session")));

        let stressed = InsightSignals {
            stress_level: StressLevel::High,
            ..long
        };
        assert!(!recommendations(&stressed)
            .iter()
            .any(|r| r.starts_with("Long session")));
    }
}
