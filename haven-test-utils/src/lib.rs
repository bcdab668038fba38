//! HAVEN Test Utilities
//!
//! Shared test infrastructure for the HAVEN workspace:
//! - Scriptable mock fetcher with a call log
//! - Proptest generators for cache and predictor inputs
//! - Fixtures for common stores and payloads
//! - Assertions for fetch and preload outcomes

pub use haven_cache::{
    CacheStore, CriticalResourceLoader, OfflineContentManager, PreloadResult, ResourceDescriptor,
    ResourceFetcher, SetOptions,
};
pub use haven_core::{
    CacheConfig, Clock, Connectivity, FetchError, HavenConfig, HavenError, HavenResult,
    ManualClock, MatchStrategy, PredictorConfig, Priority, StressLevel, Timestamp,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// ============================================================================
// MOCK FETCHER
// ============================================================================

#[derive(Debug, Clone)]
enum Behavior {
    Respond(Value),
    Fail(String),
    Delay(Duration, Value),
    Hang,
}

#[derive(Debug, Default)]
struct MockState {
    scripted: HashMap<String, Behavior>,
    fail_all: Option<String>,
    calls: Vec<String>,
}

/// Scriptable fetcher for tests.
///
/// Unscripted keys resolve to [`fixtures::resource_payload`]. Clones share
/// the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    state: Arc<Mutex<MockState>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn script(&self, key: impl Into<String>, behavior: Behavior) -> &Self {
        self.lock().scripted.insert(key.into(), behavior);
        self
    }

    /// Resolve `key` to `payload`.
    pub fn respond(&self, key: impl Into<String>, payload: Value) -> &Self {
        self.script(key, Behavior::Respond(payload))
    }

    /// Reject `key` with a `FetchError::Failed`.
    pub fn fail(&self, key: impl Into<String>, reason: impl Into<String>) -> &Self {
        self.script(key, Behavior::Fail(reason.into()))
    }

    /// Resolve `key` with the default payload after `delay`.
    pub fn delay(&self, key: impl Into<String>, delay: Duration) -> &Self {
        let key = key.into();
        let payload = fixtures::resource_payload(&key);
        self.script(key, Behavior::Delay(delay, payload))
    }

    /// Never resolve `key`.
    pub fn hang(&self, key: impl Into<String>) -> &Self {
        self.script(key, Behavior::Hang)
    }

    /// Reject every key, scripted or not.
    pub fn fail_all(&self, reason: impl Into<String>) -> &Self {
        self.lock().fail_all = Some(reason.into());
        self
    }

    /// Clear scripted behavior and `fail_all`. The call log is kept.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.scripted.clear();
        state.fail_all = None;
    }

    /// Every key fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.lock().calls.iter().filter(|k| *k == key).count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    /// Share as a trait object.
    pub fn shared(&self) -> Arc<dyn ResourceFetcher<Value>> {
        Arc::new(self.clone())
    }

    /// Descriptors for `keys`, all backed by this fetcher.
    pub fn descriptors(&self, keys: &[&str]) -> Vec<ResourceDescriptor<Value>> {
        let fetcher = self.shared();
        keys.iter()
            .map(|key| ResourceDescriptor::new(*key, Arc::clone(&fetcher)))
            .collect()
    }
}

#[async_trait]
impl ResourceFetcher<Value> for MockFetcher {
    async fn fetch(&self, key: &str) -> Result<Value, FetchError> {
        let behavior = {
            let mut state = self.lock();
            state.calls.push(key.to_string());
            match &state.fail_all {
                Some(reason) => Behavior::Fail(reason.clone()),
                None => state
                    .scripted
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| Behavior::Respond(fixtures::resource_payload(key))),
            }
        };

        match behavior {
            Behavior::Respond(payload) => Ok(payload),
            Behavior::Fail(reason) => Err(FetchError::failed(key, reason)),
            Behavior::Delay(delay, payload) => {
                tokio::time::sleep(delay).await;
                Ok(payload)
            }
            Behavior::Hang => std::future::pending().await,
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for HAVEN inputs.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Critical),
            Just(Priority::Important),
            Just(Priority::NiceToHave),
        ]
    }

    pub fn arb_stress_level() -> impl Strategy<Value = StressLevel> {
        prop_oneof![
            Just(StressLevel::Low),
            Just(StressLevel::Moderate),
            Just(StressLevel::High),
            Just(StressLevel::Crisis),
        ]
    }

    pub fn arb_connectivity() -> impl Strategy<Value = Connectivity> {
        any::<bool>().prop_map(Connectivity::from)
    }

    /// Short lowercase resource key.
    pub fn arb_cache_key() -> impl Strategy<Value = String> {
        "[a-z]{1,8}(-[a-z]{1,8})?"
    }

    /// TTL between one second and one day.
    pub fn arb_ttl() -> impl Strategy<Value = Duration> {
        (1u64..=86_400).prop_map(Duration::from_secs)
    }

    pub fn arb_set_options() -> impl Strategy<Value = SetOptions> {
        (proptest::option::of(arb_priority()), proptest::option::of(arb_ttl())).prop_map(
            |(priority, ttl)| SetOptions { priority, ttl },
        )
    }

    /// Small JSON payloads.
    pub fn arb_payload() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 ]{0,24}".prop_map(|s| json!(s)),
            ("[a-z]{1,8}", any::<bool>()).prop_map(|(k, b)| {
                let mut map = serde_json::Map::new();
                map.insert(k, Value::Bool(b));
                Value::Object(map)
            }),
        ]
    }

    /// Action tags that never collide with a known trigger or stress tag.
    pub fn arb_neutral_action() -> impl Strategy<Value = String> {
        "[a-z]{4,10}".prop_map(|s| format!("view_{}", s))
    }

    /// Pick a tag from a fixed vocabulary.
    pub fn arb_action_from(vocabulary: &'static [&'static str]) -> impl Strategy<Value = String> {
        proptest::sample::select(vocabulary).prop_map(str::to_string)
    }

    /// Mix of vocabulary tags and neutral actions.
    pub fn arb_action_sequence(
        vocabulary: &'static [&'static str],
        max_len: usize,
    ) -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec(
            prop_oneof![arb_action_from(vocabulary), arb_neutral_action()],
            0..=max_len,
        )
    }

    pub fn arb_cache_config() -> impl Strategy<Value = CacheConfig> {
        (1usize..=64, 1u64..=600, 1u64..=3600).prop_map(|(max_size, default_ttl, critical_ttl)| {
            CacheConfig::default()
                .with_max_size(max_size)
                .with_default_ttl(Duration::from_secs(default_ttl))
                .with_critical_ttl(Duration::from_secs(critical_ttl))
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common test scenarios.

    use super::*;

    /// Default payload the mock fetcher returns for `key`.
    pub fn resource_payload(key: &str) -> Value {
        json!({
            "key": key,
            "content": format!("content for {}", key),
        })
    }

    /// Small store settings with short TTLs and fetch timeout.
    pub fn test_cache_config() -> CacheConfig {
        CacheConfig::default()
            .with_max_size(32)
            .with_default_ttl(Duration::from_secs(300))
            .with_critical_ttl(Duration::from_secs(1800))
            .with_sweep_interval(Duration::from_secs(1))
            .with_fetch_timeout(Duration::from_millis(200))
    }

    pub fn test_config() -> HavenConfig {
        HavenConfig {
            cache: test_cache_config(),
            predictor: PredictorConfig::default(),
        }
    }

    /// A JSON store driven by a fresh manual clock.
    pub fn manual_store(config: CacheConfig) -> (Arc<CacheStore<Value>>, ManualClock) {
        let clock = ManualClock::default();
        let store = Arc::new(CacheStore::new(config, Arc::new(clock.clone())));
        (store, clock)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for fetch and preload outcomes.

    use super::*;

    #[track_caller]
    pub fn assert_timeout<T: std::fmt::Debug>(result: &Result<T, FetchError>) {
        match result {
            Err(FetchError::Timeout { .. }) => {}
            other => panic!("Expected Timeout, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_cancelled<T: std::fmt::Debug>(result: &Result<T, FetchError>) {
        match result {
            Err(FetchError::Cancelled { .. }) => {}
            other => panic!("Expected Cancelled, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_fetch_error<T: std::fmt::Debug>(result: &HavenResult<T>) {
        match result {
            Err(HavenError::Fetch(_)) => {}
            other => panic!("Expected Fetch error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &HavenResult<T>) {
        match result {
            Err(HavenError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert `{loaded, failed, total}` of a preload.
    #[track_caller]
    pub fn assert_preload_counts(result: &PreloadResult, loaded: u32, failed: u32, total: u32) {
        assert_eq!(
            (result.loaded, result.failed, result.total),
            (loaded, failed, total),
            "Unexpected preload counts: {:?}",
            result
        );
    }
}
