//! Background Expiry Sweep
//!
//! Entries written once and never read again would otherwise hold a capacity
//! slot until something evicts them. The sweeper removes every expired entry
//! on a fixed interval, independent of reads.
//!
//! The task is owned by a [`CacheSweeper`] handle. It runs until
//! [`CacheSweeper::stop`] is awaited (or the handle is dropped), so its
//! lifetime is tied explicitly to application startup and shutdown.
//!
//! ```ignore
//! let store = Arc::new(CacheStore::new(config.clone(), Arc::new(SystemClock)));
//! let sweeper = CacheSweeper::start(store.clone(), config.sweep_interval);
//!
//! // ... application runs ...
//!
//! let snapshot = sweeper.stop().await;
//! tracing::info!(removed = snapshot.removed, "Sweeper stopped");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::store::CacheStore;

// ============================================================================
// METRICS
// ============================================================================

/// Counters for sweep activity.
#[derive(Debug, Default)]
pub struct SweepMetrics {
    /// Total sweep cycles completed
    pub cycles: AtomicU64,

    /// Total expired entries removed by the sweeper
    pub removed: AtomicU64,
}

impl SweepMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> SweepSnapshot {
        SweepSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of sweep metrics at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSnapshot {
    pub cycles: u64,
    pub removed: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Sweep loop. Runs until the shutdown signal flips to `true` or its sender drops.
pub async fn sweep_task<T: Send + 'static>(
    store: Arc<CacheStore<T>>,
    sweep_interval: Duration,
    metrics: Arc<SweepMetrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // First tick fires one interval from now, not immediately.
    let mut ticker = interval_at(Instant::now() + sweep_interval, sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        sweep_interval_ms = sweep_interval.as_millis() as u64,
        max_size = store.max_size(),
        "Cache sweeper started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Cache sweeper shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                sweep_once(&store, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        removed = snapshot.removed,
        "Cache sweeper completed"
    );
}

fn sweep_once<T>(store: &CacheStore<T>, metrics: &SweepMetrics) {
    metrics.cycles.fetch_add(1, Ordering::Relaxed);
    let removed = store.sweep_expired();
    if removed > 0 {
        metrics.removed.fetch_add(removed as u64, Ordering::Relaxed);
        tracing::debug!(
            removed,
            remaining = store.len(),
            "Cache sweep removed expired entries"
        );
    } else {
        tracing::trace!("Cache sweep completed with no expired entries");
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Owner of a running sweep task.
#[derive(Debug)]
pub struct CacheSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    metrics: Arc<SweepMetrics>,
}

impl CacheSweeper {
    /// Spawn the sweep task on the current tokio runtime.
    pub fn start<T: Send + 'static>(store: Arc<CacheStore<T>>, sweep_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let metrics = Arc::new(SweepMetrics::new());
        let handle = tokio::spawn(sweep_task(
            store,
            sweep_interval,
            Arc::clone(&metrics),
            shutdown_rx,
        ));
        Self {
            shutdown_tx,
            handle: Some(handle),
            metrics,
        }
    }

    /// Current metrics without stopping the task.
    pub fn metrics(&self) -> SweepSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal shutdown and wait for the task to exit.
    pub async fn stop(mut self) -> SweepSnapshot {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Cache sweeper task failed");
            }
        }
        self.metrics.snapshot()
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        // A dropped handle must not leave the timer running.
        let _ = self.shutdown_tx.send(true);
    }
}
