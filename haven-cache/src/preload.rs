//! Best-effort concurrent preloading.
//!
//! [`CriticalResourceLoader::preload`] issues every fetch at once and waits
//! for all of them to settle. A failed, timed-out, or cancelled fetch is
//! logged and counted in the [`PreloadResult`]; it never aborts the others.
//! Callers must not assume every resource is cached afterwards.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use haven_core::{FetchError, Priority};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::offline::OfflineContentManager;
use crate::store::{CacheStore, SetOptions};

// ============================================================================
// FETCHERS
// ============================================================================

/// Host-supplied source of resource payloads.
#[async_trait]
pub trait ResourceFetcher<T>: Send + Sync {
    /// Fetch the payload for `key`.
    async fn fetch(&self, key: &str) -> Result<T, FetchError>;
}

/// Adapts an async closure taking the key into a [`ResourceFetcher`].
#[derive(Clone)]
pub struct FnFetcher<F> {
    f: F,
}

impl<F> FnFetcher<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, F, Fut> ResourceFetcher<T> for FnFetcher<F>
where
    T: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    async fn fetch(&self, key: &str) -> Result<T, FetchError> {
        (self.f)(key.to_string()).await
    }
}

/// A named resource and the fetcher that produces it.
pub struct ResourceDescriptor<T> {
    pub key: String,
    pub fetcher: Arc<dyn ResourceFetcher<T>>,
}

impl<T> ResourceDescriptor<T> {
    pub fn new(key: impl Into<String>, fetcher: Arc<dyn ResourceFetcher<T>>) -> Self {
        Self {
            key: key.into(),
            fetcher,
        }
    }
}

impl<T: Send + 'static> ResourceDescriptor<T> {
    /// Build a descriptor from an async closure.
    pub fn from_fn<F, Fut>(key: impl Into<String>, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        Self::new(key, Arc::new(FnFetcher::new(f)))
    }
}

impl<T> Clone for ResourceDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<T> fmt::Debug for ResourceDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PLAN & RESULT
// ============================================================================

/// How successful fetches are written.
pub struct PreloadPlan<T> {
    pub priority: Priority,
    /// TTL override; `None` uses the store's TTL for `priority`.
    pub ttl: Option<Duration>,
    /// When set, each success is also cached for offline use.
    pub offline: Option<Arc<OfflineContentManager<T>>>,
}

impl<T> PreloadPlan<T> {
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            ttl: None,
            offline: None,
        }
    }

    /// Critical priority, store TTL, no offline mirror.
    pub fn critical() -> Self {
        Self::new(Priority::Critical)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_offline(mut self, offline: Arc<OfflineContentManager<T>>) -> Self {
        self.offline = Some(offline);
        self
    }

    fn set_options(&self) -> SetOptions {
        let options = SetOptions::new().with_priority(self.priority);
        match self.ttl {
            Some(ttl) => options.with_ttl(ttl),
            None => options,
        }
    }
}

impl<T> Clone for PreloadPlan<T> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            ttl: self.ttl,
            offline: self.offline.clone(),
        }
    }
}

impl<T> fmt::Debug for PreloadPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloadPlan")
            .field("priority", &self.priority)
            .field("ttl", &self.ttl)
            .field("offline", &self.offline.is_some())
            .finish()
    }
}

/// Outcome counts of one preload batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadResult {
    pub loaded: u32,
    pub failed: u32,
    pub total: u32,
    /// Keys whose fetch failed, timed out, or was cancelled, in request order.
    pub failed_keys: Vec<String>,
}

impl PreloadResult {
    /// True when every requested resource was loaded.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.loaded == self.total
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Concurrent fetcher that writes successes into the shared store.
pub struct CriticalResourceLoader<T> {
    store: Arc<CacheStore<T>>,
    fetch_timeout: Duration,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<T> CriticalResourceLoader<T> {
    /// Uses the store's configured fetch timeout.
    pub fn new(store: Arc<CacheStore<T>>) -> Self {
        let fetch_timeout = store.config().fetch_timeout;
        Self {
            store,
            fetch_timeout,
            shutdown: None,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Cancel in-flight fetches once `shutdown` flips to `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn store(&self) -> &Arc<CacheStore<T>> {
        &self.store
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// One fetch bounded by the timeout and the shutdown signal.
    pub async fn fetch_one(
        &self,
        key: &str,
        fetcher: &dyn ResourceFetcher<T>,
    ) -> Result<T, FetchError> {
        let bounded = tokio::time::timeout(self.fetch_timeout, fetcher.fetch(key));

        let Some(mut shutdown) = self.shutdown.clone() else {
            return self.flatten(key, bounded.await);
        };
        if *shutdown.borrow_and_update() {
            return Err(FetchError::Cancelled {
                key: key.to_string(),
            });
        }

        tokio::select! {
            outcome = bounded => self.flatten(key, outcome),
            _ = shutdown_requested(&mut shutdown) => Err(FetchError::Cancelled {
                key: key.to_string(),
            }),
        }
    }

    fn flatten(
        &self,
        key: &str,
        outcome: Result<Result<T, FetchError>, tokio::time::error::Elapsed>,
    ) -> Result<T, FetchError> {
        outcome.unwrap_or_else(|_| {
            Err(FetchError::Timeout {
                key: key.to_string(),
                timeout: self.fetch_timeout,
            })
        })
    }
}

/// Resolves when shutdown is signalled. Never resolves if the sender is
/// dropped without signalling.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl<T: Clone + Send + Sync + 'static> CriticalResourceLoader<T> {
    /// Fetch everything concurrently and cache successes at critical priority.
    pub async fn preload(&self, descriptors: &[ResourceDescriptor<T>]) -> PreloadResult {
        self.preload_with(descriptors, &PreloadPlan::critical()).await
    }

    /// Fetch everything concurrently and cache successes according to `plan`.
    ///
    /// Each success is written as soon as its own fetch settles.
    pub async fn preload_with(
        &self,
        descriptors: &[ResourceDescriptor<T>],
        plan: &PreloadPlan<T>,
    ) -> PreloadResult {
        let options = plan.set_options();
        let fetches = descriptors.iter().map(|descriptor| async move {
            let key = descriptor.key.as_str();
            match self.fetch_one(key, descriptor.fetcher.as_ref()).await {
                Ok(data) => {
                    if let Some(offline) = &plan.offline {
                        offline.cache_for_offline(key, data.clone());
                    }
                    self.store.set(key, data, options);
                    true
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Preload fetch failed");
                    false
                }
            }
        });
        let outcomes = join_all(fetches).await;

        let mut result = PreloadResult {
            total: descriptors.len() as u32,
            ..PreloadResult::default()
        };
        for (descriptor, loaded) in descriptors.iter().zip(outcomes) {
            if loaded {
                result.loaded += 1;
            } else {
                result.failed += 1;
                result.failed_keys.push(descriptor.key.clone());
            }
        }

        tracing::debug!(
            priority = %plan.priority,
            loaded = result.loaded,
            failed = result.failed,
            total = result.total,
            "Preload batch settled"
        );
        result
    }
}

impl<T> fmt::Debug for CriticalResourceLoader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriticalResourceLoader")
            .field("fetch_timeout", &self.fetch_timeout)
            .field("cancellable", &self.shutdown.is_some())
            .finish_non_exhaustive()
    }
}
