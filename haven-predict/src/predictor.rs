//! Workflow predictor.
//!
//! Each tracked action is classified for stress, then matched against the
//! pattern table. Both steps finish before any preload is dispatched, and
//! preloads run as spawned tasks so `track_action` never waits on a fetch.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use haven_cache::{
    CacheStore, CriticalResourceLoader, OfflineContentManager, PreloadPlan, PreloadResult,
    ResourceDescriptor, ResourceFetcher, SetOptions,
};
use haven_core::{HavenResult, PredictorConfig, Priority, StressLevel};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::insights::{recommendations, InsightSignals, WorkflowInsights};
use crate::patterns::{
    find_pattern, match_patterns, preload_tiers, WorkflowPattern, CRISIS_PATTERN_ID,
    DEFAULT_PATTERNS, ESSENTIAL_RESOURCES,
};
use crate::session::{ActionRecord, Session};
use crate::stress::{is_stress_indicator, StressLevelEstimator};

/// Buffered crisis reports per subscriber before it starts lagging.
const CRISIS_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// REPORTS
// ============================================================================

/// Why a preload was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PreloadKind {
    /// Stress rose into high or crisis.
    Escalation(StressLevel),
    /// Matched patterns of the given tier.
    Pattern(Priority),
    /// Time-constraint mode was enabled.
    TimeConstraint,
}

/// Handle to a preload running in the background.
///
/// Dropping it detaches the task; the preload still completes.
#[derive(Debug)]
pub struct PreloadTask {
    kind: PreloadKind,
    keys: Vec<String>,
    handle: JoinHandle<PreloadResult>,
}

impl PreloadTask {
    pub fn kind(&self) -> PreloadKind {
        self.kind
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Wait for the preload to settle.
    ///
    /// A task that panicked or was aborted reports every key as failed.
    pub async fn join(self) -> PreloadResult {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(kind = ?self.kind, error = %e, "Preload task failed");
                PreloadResult {
                    loaded: 0,
                    failed: self.keys.len() as u32,
                    total: self.keys.len() as u32,
                    failed_keys: self.keys,
                }
            }
        }
    }
}

/// Outcome of one `track_action` call.
#[derive(Debug)]
pub struct ActionReport {
    pub stress_level: StressLevel,
    /// True when this action raised stress into high or crisis.
    pub escalated: bool,
    /// Ids of the patterns the action triggered.
    pub matched_patterns: Vec<&'static str>,
    pub preloads: Vec<PreloadTask>,
}

impl ActionReport {
    /// Wait for every dispatched preload, in dispatch order.
    pub async fn join_preloads(self) -> Vec<(PreloadKind, PreloadResult)> {
        let mut results = Vec::with_capacity(self.preloads.len());
        for task in self.preloads {
            let kind = task.kind();
            results.push((kind, task.join().await));
        }
        results
    }
}

/// Published after every escalation-driven crisis preload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrisisPreloadReport {
    pub stress_level: StressLevel,
    pub result: PreloadResult,
}

// ============================================================================
// PREDICTOR
// ============================================================================

#[derive(Debug)]
struct PredictorState {
    session: Session,
    estimator: StressLevelEstimator,
    predicted_needs: BTreeSet<String>,
}

impl PredictorState {
    fn new(session: Session, window: usize) -> Self {
        Self {
            session,
            estimator: StressLevelEstimator::new(window),
            predicted_needs: BTreeSet::new(),
        }
    }
}

/// Maps user actions to predicted resource needs and keeps them cached.
pub struct WorkflowPredictor<T> {
    store: Arc<CacheStore<T>>,
    offline: Arc<OfflineContentManager<T>>,
    loader: Arc<CriticalResourceLoader<T>>,
    fetcher: Arc<dyn ResourceFetcher<T>>,
    config: PredictorConfig,
    patterns: Vec<WorkflowPattern>,
    state: Mutex<PredictorState>,
    crisis_tx: broadcast::Sender<CrisisPreloadReport>,
}

impl<T> WorkflowPredictor<T> {
    /// Build a predictor over the loader's store, using the default pattern table.
    pub fn new(
        loader: Arc<CriticalResourceLoader<T>>,
        offline: Arc<OfflineContentManager<T>>,
        fetcher: Arc<dyn ResourceFetcher<T>>,
        config: PredictorConfig,
    ) -> Self {
        let store = Arc::clone(loader.store());
        let session = Session::new(store.clock().now());
        let (crisis_tx, _) = broadcast::channel(CRISIS_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(PredictorState::new(session, config.stress_window)),
            store,
            offline,
            loader,
            fetcher,
            config,
            patterns: DEFAULT_PATTERNS.to_vec(),
            crisis_tx,
        }
    }

    /// Replace the pattern table.
    pub fn with_patterns(mut self, patterns: Vec<WorkflowPattern>) -> Self {
        self.patterns = patterns;
        self
    }

    fn lock(&self) -> MutexGuard<'_, PredictorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn patterns(&self) -> &[WorkflowPattern] {
        &self.patterns
    }

    pub fn store(&self) -> &Arc<CacheStore<T>> {
        &self.store
    }

    pub fn offline(&self) -> &Arc<OfflineContentManager<T>> {
        &self.offline
    }

    /// Receive a report for every escalation-driven crisis preload.
    pub fn subscribe_crisis_preloads(&self) -> broadcast::Receiver<CrisisPreloadReport> {
        self.crisis_tx.subscribe()
    }

    pub fn stress_level(&self) -> StressLevel {
        self.lock().session.stress_level
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    /// Distinct resources predicted this session, sorted.
    pub fn predicted_needs(&self) -> Vec<String> {
        self.lock().predicted_needs.iter().cloned().collect()
    }

    pub fn is_time_constrained(&self) -> bool {
        self.lock().session.time_constrained
    }

    /// Discard the session and its predictions, and start a fresh one.
    ///
    /// Returns the ended session.
    pub fn end_session(&self) -> Session {
        let fresh = Session::new(self.store.clock().now());
        let mut state = self.lock();
        let ended = std::mem::replace(
            &mut *state,
            PredictorState::new(fresh, self.config.stress_window),
        );
        tracing::info!(
            session_id = %ended.session.id,
            actions_tracked = ended.session.actions_tracked,
            next_session_id = %state.session.id,
            "Session ended"
        );
        ended.session
    }

    pub fn get_workflow_insights(&self) -> WorkflowInsights {
        let now = self.store.clock().now();
        let state = self.lock();
        let session = &state.session;
        let session_duration = session.duration(now);
        let signals = InsightSignals {
            stress_level: session.stress_level,
            time_constrained: session.time_constrained,
            predicted_needs: state.predicted_needs.len(),
            session_duration,
            connectivity: self.offline.connectivity(),
        };
        WorkflowInsights {
            session_id: session.id,
            session_duration,
            stress_level: session.stress_level,
            predicted_needs: state.predicted_needs.len(),
            actions_tracked: session.actions_tracked,
            time_constrained: session.time_constrained,
            recommendations: recommendations(&signals),
        }
    }

    fn crisis_keys(&self) -> Vec<String> {
        find_pattern(&self.patterns, CRISIS_PATTERN_ID)
            .map(|p| p.resource_keys.iter().map(|k| k.to_string()).collect())
            .unwrap_or_default()
    }

    fn descriptors(&self, keys: &[String]) -> Vec<ResourceDescriptor<T>> {
        keys.iter()
            .map(|key| ResourceDescriptor::new(key.clone(), Arc::clone(&self.fetcher)))
            .collect()
    }
}

impl<T: Clone + Send + Sync + 'static> WorkflowPredictor<T> {
    /// Record an action, reclassify stress, and dispatch predicted preloads.
    ///
    /// Must be called within a tokio runtime. Does not wait for fetches.
    pub fn track_action(&self, action: &str, context: Option<serde_json::Value>) -> ActionReport {
        let now = self.store.clock().now();
        let strategy = self.config.match_strategy;

        let (transition, matched, crisis_keys) = {
            let mut state = self.lock();
            let transition = state.estimator.observe(action);
            state.session.stress_level = transition.to;
            let crisis_keys = if transition.escalated() {
                self.crisis_keys()
            } else {
                Vec::new()
            };
            state.predicted_needs.extend(crisis_keys.iter().cloned());
            state.session.record(
                ActionRecord {
                    action: action.to_string(),
                    context,
                    recorded_at: now,
                    stress_indicator: is_stress_indicator(action),
                },
                self.config.history_limit,
            );

            let matched = match_patterns(&self.patterns, action, strategy);
            for pattern in &matched {
                state
                    .predicted_needs
                    .extend(pattern.resource_keys.iter().map(|k| k.to_string()));
            }
            (transition, matched, crisis_keys)
        };

        let mut preloads = Vec::new();
        let escalated = transition.escalated();
        if escalated {
            tracing::debug!(
                action = %action,
                from = %transition.from,
                to = %transition.to,
                "Stress level escalated"
            );
            if crisis_keys.is_empty() {
                tracing::warn!(
                    pattern = CRISIS_PATTERN_ID,
                    to = %transition.to,
                    "No crisis resources in the pattern table, skipping escalation preload"
                );
            } else {
                preloads.push(self.spawn_crisis_preload(transition.to, crisis_keys.clone()));
            }
        }

        for (tier, keys) in preload_tiers(&matched) {
            // Keys already covered by the crisis preload are not fetched twice.
            let keys: Vec<String> = keys
                .into_iter()
                .filter(|key| !crisis_keys.contains(key))
                .collect();
            if keys.is_empty() {
                continue;
            }
            if let Some(task) = self.spawn_tier_preload(tier, keys) {
                preloads.push(task);
            }
        }

        let matched_patterns: Vec<&'static str> = matched.iter().map(|p| p.id).collect();
        if !matched_patterns.is_empty() {
            tracing::debug!(
                action = %action,
                patterns = ?matched_patterns,
                strategy = %strategy,
                "Action matched workflow patterns"
            );
        }

        ActionReport {
            stress_level: transition.to,
            escalated,
            matched_patterns,
            preloads,
        }
    }

    /// Cached resource, else offline copy while offline, else a bounded fetch.
    pub async fn get_optimized_resource(&self, key: &str) -> HavenResult<T> {
        let fetcher = Arc::clone(&self.fetcher);
        self.get_optimized_resource_with(key, fetcher.as_ref()).await
    }

    /// As [`Self::get_optimized_resource`] with a caller-supplied fetcher.
    ///
    /// A fetched resource is cached at critical priority during a crisis and
    /// at important priority otherwise. When the fetch fails, any offline copy
    /// is returned instead of the error.
    pub async fn get_optimized_resource_with(
        &self,
        key: &str,
        fetcher: &dyn ResourceFetcher<T>,
    ) -> HavenResult<T> {
        if let Some(data) = self.store.get(key) {
            return Ok(data);
        }
        if let Some(data) = self.offline.get_offline_content(key) {
            tracing::debug!(key = %key, "Serving offline copy");
            return Ok(data);
        }

        match self.loader.fetch_one(key, fetcher).await {
            Ok(data) => {
                let priority = if self.stress_level() == StressLevel::Crisis {
                    Priority::Critical
                } else {
                    Priority::Important
                };
                self.store.set(
                    key,
                    data.clone(),
                    SetOptions::new().with_priority(priority),
                );
                Ok(data)
            }
            Err(e) => match self.offline.offline_copy(key) {
                Some(data) => {
                    tracing::warn!(key = %key, error = %e, "Fetch failed, serving offline copy");
                    Ok(data)
                }
                None => {
                    tracing::warn!(key = %key, error = %e, "Fetch failed with no fallback");
                    Err(e.into())
                }
            },
        }
    }

    /// Mark the session time-constrained and preload the essential resources.
    ///
    /// Essentials are cached at critical priority and mirrored offline.
    pub fn enable_time_constraint_mode(&self) -> PreloadTask {
        {
            let mut state = self.lock();
            state.session.time_constrained = true;
            state
                .predicted_needs
                .extend(ESSENTIAL_RESOURCES.iter().map(|k| k.to_string()));
        }
        tracing::info!("Time-constraint mode enabled");

        let keys: Vec<String> = ESSENTIAL_RESOURCES.iter().map(|k| k.to_string()).collect();
        let plan = PreloadPlan::critical().with_offline(Arc::clone(&self.offline));
        self.spawn_preload(PreloadKind::TimeConstraint, keys, plan, None)
    }

    fn spawn_crisis_preload(&self, level: StressLevel, keys: Vec<String>) -> PreloadTask {
        let mut plan =
            PreloadPlan::new(Priority::Critical).with_offline(Arc::clone(&self.offline));
        plan.ttl = self.config.tier_ttl(Priority::Critical);
        self.spawn_preload(
            PreloadKind::Escalation(level),
            keys,
            plan,
            Some(self.crisis_tx.clone()),
        )
    }

    fn spawn_tier_preload(&self, tier: Priority, keys: Vec<String>) -> Option<PreloadTask> {
        let ttl = self.config.tier_ttl(tier)?;
        let mut plan = PreloadPlan::new(tier).with_ttl(ttl);
        if tier == Priority::Critical {
            plan = plan.with_offline(Arc::clone(&self.offline));
        }
        Some(self.spawn_preload(PreloadKind::Pattern(tier), keys, plan, None))
    }

    fn spawn_preload(
        &self,
        kind: PreloadKind,
        keys: Vec<String>,
        plan: PreloadPlan<T>,
        crisis_tx: Option<broadcast::Sender<CrisisPreloadReport>>,
    ) -> PreloadTask {
        let descriptors = self.descriptors(&keys);
        let loader = Arc::clone(&self.loader);
        let handle = tokio::spawn(async move {
            let result = loader.preload_with(&descriptors, &plan).await;
            if result.failed > 0 {
                tracing::warn!(
                    kind = ?kind,
                    failed = result.failed,
                    failed_keys = ?result.failed_keys,
                    "Preload incomplete"
                );
            }
            if let (Some(tx), PreloadKind::Escalation(stress_level)) = (crisis_tx, kind) {
                // No subscribers is not an error.
                let _ = tx.send(CrisisPreloadReport {
                    stress_level,
                    result: result.clone(),
                });
            }
            result
        });
        PreloadTask { kind, keys, handle }
    }
}

impl<T> std::fmt::Debug for WorkflowPredictor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowPredictor")
            .field("config", &self.config)
            .field("patterns", &self.patterns.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{FetchError, HavenError, ManualClock, MatchStrategy};
    use haven_test_utils::assertions::assert_preload_counts;
    use haven_test_utils::{fixtures, MockFetcher};
    use serde_json::{json, Value};
    use std::time::Duration;

    struct Harness {
        predictor: WorkflowPredictor<Value>,
        fetcher: MockFetcher,
        clock: ManualClock,
    }

    fn harness(config: PredictorConfig) -> Harness {
        let (store, clock) = fixtures::manual_store(fixtures::test_cache_config());
        let offline = Arc::new(OfflineContentManager::new(Arc::clone(&store)));
        let loader = Arc::new(CriticalResourceLoader::new(store));
        let fetcher = MockFetcher::new();
        let predictor = WorkflowPredictor::new(loader, offline, fetcher.shared(), config);
        Harness {
            predictor,
            fetcher,
            clock,
        }
    }

    #[tokio::test]
    async fn test_neutral_action_dispatches_nothing() {
        let h = harness(PredictorConfig::default());
        let report = h.predictor.track_action("view_home", None);
        assert_eq!(report.stress_level, StressLevel::Low);
        assert!(!report.escalated);
        assert!(report.matched_patterns.is_empty());
        assert!(report.preloads.is_empty());
        assert_eq!(h.predictor.session().actions_tracked, 1);
    }

    #[tokio::test]
    async fn test_important_pattern_preloads_with_tier_ttl() {
        let h = harness(PredictorConfig::default());
        let report = h.predictor.track_action("find_provider", Some(json!({"zip": "02139"})));
        assert_eq!(report.matched_patterns, vec!["provider-search"]);

        let results = report.join_preloads().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, PreloadKind::Pattern(Priority::Important));
        assert_preload_counts(&results[0].1, 3, 0, 3);

        let meta = h.predictor.store().entry_metadata("insurance-info").unwrap();
        assert_eq!(meta.priority, Priority::Important);
        assert_eq!(meta.ttl, Duration::from_secs(1800));
        assert!(!h.predictor.offline().has_offline_content("insurance-info"));

        let session = h.predictor.session();
        assert_eq!(
            session.last_action().unwrap().context,
            Some(json!({"zip": "02139"}))
        );
    }

    #[tokio::test]
    async fn test_nice_to_have_is_predicted_but_not_preloaded() {
        let h = harness(PredictorConfig::default());
        let report = h.predictor.track_action("journal_open", None);
        assert_eq!(report.matched_patterns, vec!["self-care"]);
        assert!(report.preloads.is_empty());
        assert_eq!(
            h.predictor.predicted_needs(),
            vec!["journal-prompts", "meditation-audio", "wellness-tips"]
        );
        assert_eq!(h.fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_crisis_trigger_and_stress_tag_do_not_double_fetch() {
        let h = harness(PredictorConfig::default());
        // Moderate after the first, high after the second.
        h.predictor.track_action("help_search", None);
        let report = h.predictor.track_action("crisis_button_click", None);

        assert!(report.escalated);
        assert_eq!(report.stress_level, StressLevel::High);
        assert_eq!(report.matched_patterns, vec!["crisis-support"]);
        assert_eq!(report.preloads.len(), 1);
        assert_eq!(
            report.preloads[0].kind(),
            PreloadKind::Escalation(StressLevel::High)
        );

        report.join_preloads().await;
        assert_eq!(h.fetcher.call_count("safety-plan"), 1);
        let meta = h.predictor.store().entry_metadata("safety-plan").unwrap();
        assert_eq!(meta.priority, Priority::Critical);
        assert_eq!(meta.ttl, Duration::from_secs(3600));
        assert!(h.predictor.offline().has_offline_content("grounding-techniques"));
    }

    #[tokio::test]
    async fn test_crisis_preload_failures_are_published() {
        let h = harness(PredictorConfig::default());
        let mut reports = h.predictor.subscribe_crisis_preloads();
        h.fetcher.fail("emergency-contacts", "upstream 500");

        h.predictor.track_action("rapid_navigation", None);
        let report = h.predictor.track_action("rapid_navigation", None);
        report.join_preloads().await;

        let published = reports.recv().await.unwrap();
        assert_eq!(published.stress_level, StressLevel::High);
        assert_preload_counts(&published.result, 3, 1, 4);
        assert_eq!(published.result.failed_keys, vec!["emergency-contacts"]);
    }

    #[tokio::test]
    async fn test_escalation_records_crisis_resources_as_needs() {
        let h = harness(PredictorConfig::default());
        for _ in 0..4 {
            h.predictor
                .track_action("error_encountered", None)
                .join_preloads()
                .await;
        }
        assert_eq!(h.fetcher.call_count("crisis-hotlines"), 2);
        assert_eq!(
            h.predictor.predicted_needs(),
            vec![
                "crisis-hotlines",
                "emergency-contacts",
                "grounding-techniques",
                "safety-plan"
            ]
        );

        let insights = h.predictor.get_workflow_insights();
        assert_eq!(insights.stress_level, StressLevel::Crisis);
        assert_eq!(insights.predicted_needs, 4);
        assert!(!insights
            .recommendations
            .iter()
            .any(|r| r.starts_with("Not enough activity")));
    }

    #[tokio::test]
    async fn test_escalation_without_crisis_pattern_skips_preload() {
        let patterns = crate::patterns::DEFAULT_PATTERNS
            .iter()
            .filter(|p| p.id != CRISIS_PATTERN_ID)
            .copied()
            .collect();
        let h = harness(PredictorConfig::default());
        let predictor = h.predictor.with_patterns(patterns);
        let mut reports = predictor.subscribe_crisis_preloads();

        predictor.track_action("rapid_navigation", None);
        let report = predictor.track_action("rapid_navigation", None);
        assert!(report.escalated);
        assert!(report.preloads.is_empty());
        assert!(predictor.predicted_needs().is_empty());
        assert!(reports.try_recv().is_err());
        assert_eq!(h.fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_substring_strategy_matches_fragments() {
        let config = PredictorConfig::default().with_match_strategy(MatchStrategy::Substring);
        let h = harness(config);
        let report = h.predictor.track_action("provider", None);
        assert_eq!(report.matched_patterns, vec!["provider-search"]);
        report.join_preloads().await;
        assert!(h.predictor.store().has("provider-directory"));
    }

    #[tokio::test]
    async fn test_optimized_resource_prefers_cache() {
        let h = harness(PredictorConfig::default());
        h.predictor
            .store()
            .set("support-groups", json!("cached"), SetOptions::new());

        let value = h.predictor.get_optimized_resource("support-groups").await.unwrap();
        assert_eq!(value, json!("cached"));
        assert_eq!(h.fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_optimized_resource_fetches_and_caches_important() {
        let h = harness(PredictorConfig::default());
        let value = h.predictor.get_optimized_resource("wellness-tips").await.unwrap();
        assert_eq!(value, fixtures::resource_payload("wellness-tips"));

        let meta = h.predictor.store().entry_metadata("wellness-tips").unwrap();
        assert_eq!(meta.priority, Priority::Important);

        h.predictor.get_optimized_resource("wellness-tips").await.unwrap();
        assert_eq!(h.fetcher.call_count("wellness-tips"), 1);
    }

    #[tokio::test]
    async fn test_optimized_resource_escalates_priority_in_crisis() {
        let h = harness(PredictorConfig::default());
        for _ in 0..4 {
            h.predictor.track_action("error_encountered", None);
        }
        assert_eq!(h.predictor.stress_level(), StressLevel::Crisis);

        let fetcher = MockFetcher::new();
        h.predictor
            .get_optimized_resource_with("grief-articles", &fetcher)
            .await
            .unwrap();
        let meta = h.predictor.store().entry_metadata("grief-articles").unwrap();
        assert_eq!(meta.priority, Priority::Critical);
        assert_eq!(fetcher.call_count("grief-articles"), 1);
    }

    #[tokio::test]
    async fn test_optimized_resource_serves_offline_copy_while_offline() {
        let h = harness(PredictorConfig::default());
        h.predictor
            .offline()
            .cache_for_offline("safety-plan", json!("offline plan"));
        h.predictor.offline().set_online(false);

        let value = h.predictor.get_optimized_resource("safety-plan").await.unwrap();
        assert_eq!(value, json!("offline plan"));
        assert_eq!(h.fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_optimized_resource_falls_back_to_offline_copy_on_failure() {
        let h = harness(PredictorConfig::default());
        h.predictor
            .offline()
            .cache_for_offline("crisis-hotlines", json!(["988"]));
        h.fetcher.fail("crisis-hotlines", "dns failure");

        let value = h.predictor.get_optimized_resource("crisis-hotlines").await.unwrap();
        assert_eq!(value, json!(["988"]));
    }

    #[tokio::test]
    async fn test_optimized_resource_propagates_failure_without_fallback() {
        let h = harness(PredictorConfig::default());
        h.fetcher.fail("location-data", "geo service down");

        let result = h.predictor.get_optimized_resource("location-data").await;
        assert_eq!(
            result.unwrap_err(),
            HavenError::Fetch(FetchError::failed("location-data", "geo service down"))
        );
    }

    #[tokio::test]
    async fn test_time_constraint_mode() {
        let h = harness(PredictorConfig::default());
        let task = h.predictor.enable_time_constraint_mode();
        assert_eq!(task.kind(), PreloadKind::TimeConstraint);
        assert!(h.predictor.is_time_constrained());

        let result = task.join().await;
        assert!(result.is_complete());
        for key in ESSENTIAL_RESOURCES {
            let meta = h.predictor.store().entry_metadata(key).unwrap();
            assert_eq!(meta.priority, Priority::Critical);
            assert_eq!(meta.ttl, fixtures::test_cache_config().critical_ttl);
            assert!(h.predictor.offline().has_offline_content(key));
        }
        assert!(h.predictor.get_workflow_insights().time_constrained);
    }

    #[tokio::test]
    async fn test_insights_and_end_session() {
        let h = harness(PredictorConfig::default());
        h.predictor.track_action("assessment_start", None);
        h.predictor.track_action("help_search", None);
        h.clock.advance(Duration::from_secs(600));

        let insights = h.predictor.get_workflow_insights();
        assert_eq!(insights.session_duration, Duration::from_secs(600));
        assert_eq!(insights.stress_level, StressLevel::Moderate);
        assert_eq!(insights.predicted_needs, 3);
        assert_eq!(insights.actions_tracked, 2);
        assert!(!insights.recommendations.is_empty());

        let ended = h.predictor.end_session();
        assert_eq!(ended.id, insights.session_id);

        let fresh = h.predictor.get_workflow_insights();
        assert_ne!(fresh.session_id, insights.session_id);
        assert_eq!(fresh.stress_level, StressLevel::Low);
        assert_eq!(fresh.predicted_needs, 0);
        assert_eq!(fresh.session_duration, Duration::ZERO);
    }
}
