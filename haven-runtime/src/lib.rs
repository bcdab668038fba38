//! HAVEN Runtime - Lifecycle Wiring
//!
//! [`HavenRuntime`] builds the single shared [`CacheStore`] and everything
//! layered on it, starts the background sweeper, and tears both down in
//! [`HavenRuntime::shutdown`]. Hosts hold the runtime for the lifetime of
//! the application and hand out the `Arc` accessors.
//!
//! ```ignore
//! telemetry::init_tracing(&TelemetryConfig::from_env())?;
//! let runtime = HavenRuntime::start(HavenConfig::from_env(), fetcher, Arc::new(SystemClock))?;
//!
//! runtime.predictor().track_action("find_provider", None);
//!
//! let snapshot = runtime.shutdown().await;
//! ```

pub mod telemetry;

pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};

use std::sync::Arc;

use haven_cache::{
    CacheStore, CacheSweeper, CriticalResourceLoader, OfflineContentManager, ResourceFetcher,
    SweepSnapshot,
};
use haven_core::{Clock, Connectivity, HavenConfig, HavenResult};
use haven_predict::WorkflowPredictor;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owner of the cache, its background sweeper, and the predictor.
pub struct HavenRuntime<T> {
    config: HavenConfig,
    store: Arc<CacheStore<T>>,
    offline: Arc<OfflineContentManager<T>>,
    loader: Arc<CriticalResourceLoader<T>>,
    predictor: Arc<WorkflowPredictor<T>>,
    sweeper: Option<CacheSweeper>,
    shutdown_tx: watch::Sender<bool>,
}

impl<T: Clone + Send + Sync + 'static> HavenRuntime<T> {
    /// Validate `config`, build the components, and start the sweeper.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(
        config: HavenConfig,
        fetcher: Arc<dyn ResourceFetcher<T>>,
        clock: Arc<dyn Clock>,
    ) -> HavenResult<Self> {
        config.validate()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let store = Arc::new(CacheStore::new(config.cache.clone(), clock));
        let offline = Arc::new(OfflineContentManager::new(Arc::clone(&store)));
        let loader = Arc::new(
            CriticalResourceLoader::new(Arc::clone(&store)).with_shutdown(shutdown_rx),
        );
        let predictor = Arc::new(WorkflowPredictor::new(
            Arc::clone(&loader),
            Arc::clone(&offline),
            fetcher,
            config.predictor.clone(),
        ));
        let sweeper = CacheSweeper::start(Arc::clone(&store), config.cache.sweep_interval);

        tracing::info!(
            max_size = config.cache.max_size,
            sweep_interval_ms = config.cache.sweep_interval.as_millis() as u64,
            fetch_timeout_ms = config.cache.fetch_timeout.as_millis() as u64,
            match_strategy = %config.predictor.match_strategy,
            "HAVEN runtime started"
        );

        Ok(Self {
            config,
            store,
            offline,
            loader,
            predictor,
            sweeper: Some(sweeper),
            shutdown_tx,
        })
    }
}

impl<T> HavenRuntime<T> {
    pub fn config(&self) -> &HavenConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<CacheStore<T>> {
        Arc::clone(&self.store)
    }

    pub fn offline(&self) -> Arc<OfflineContentManager<T>> {
        Arc::clone(&self.offline)
    }

    pub fn loader(&self) -> Arc<CriticalResourceLoader<T>> {
        Arc::clone(&self.loader)
    }

    pub fn predictor(&self) -> Arc<WorkflowPredictor<T>> {
        Arc::clone(&self.predictor)
    }

    /// Sweep metrics so far.
    pub fn sweep_metrics(&self) -> SweepSnapshot {
        self.sweeper
            .as_ref()
            .map(CacheSweeper::metrics)
            .unwrap_or_default()
    }

    /// Cancel in-flight fetches and stop the sweeper.
    pub async fn shutdown(mut self) -> SweepSnapshot {
        let _ = self.shutdown_tx.send(true);
        let snapshot = match self.sweeper.take() {
            Some(sweeper) => sweeper.stop().await,
            None => SweepSnapshot::default(),
        };
        tracing::info!(
            sweep_cycles = snapshot.cycles,
            swept = snapshot.removed,
            entries = self.store.len(),
            "HAVEN runtime shut down"
        );
        snapshot
    }
}

impl<T: Send + Sync + 'static> HavenRuntime<T> {
    /// Follow a host connectivity signal until its sender is dropped.
    pub fn listen_connectivity(&self, signal: watch::Receiver<Connectivity>) -> JoinHandle<()> {
        self.offline.listen(signal)
    }
}

impl<T> Drop for HavenRuntime<T> {
    fn drop(&mut self) {
        // Dropping without shutdown still cancels fetches; the sweeper
        // handle stops its own task.
        let _ = self.shutdown_tx.send(true);
    }
}

impl<T> std::fmt::Debug for HavenRuntime<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HavenRuntime")
            .field("config", &self.config)
            .field("sweeper_running", &self.sweeper.is_some())
            .finish_non_exhaustive()
    }
}
