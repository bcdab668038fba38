//! HAVEN Predict - Behavioral Preloading
//!
//! Turns a stream of user action tags into cache warm-up:
//! - [`StressLevelEstimator`] classifies the last few actions as
//!   low/moderate/high/crisis
//! - [`WorkflowPattern`]s map trigger tags to resource keys and a tier
//! - [`WorkflowPredictor`] ties both to the cache, preloading crisis
//!   resources on escalation and pattern resources on every match

pub mod insights;
pub mod patterns;
pub mod predictor;
pub mod session;
pub mod stress;

pub use insights::{recommendations, InsightSignals, WorkflowInsights};
pub use patterns::{
    find_pattern, match_patterns, preload_tiers, WorkflowPattern, CRISIS_PATTERN_ID,
    DEFAULT_PATTERNS, ESSENTIAL_RESOURCES,
};
pub use predictor::{ActionReport, CrisisPreloadReport, PreloadKind, PreloadTask, WorkflowPredictor};
pub use session::{ActionRecord, Session};
pub use stress::{is_stress_indicator, StressLevelEstimator, StressTransition, STRESS_INDICATORS};
