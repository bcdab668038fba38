//! Offline content layer.
//!
//! Offline copies live in the shared [`CacheStore`] under an `"offline-"`
//! key namespace with a long fixed TTL. They are served only while the
//! connectivity signal reports offline; while online callers should prefer
//! fresh data and [`OfflineContentManager::get_offline_content`] returns `None`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use haven_core::constants::OFFLINE_KEY_PREFIX;
use haven_core::{Connectivity, Priority};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::store::{CacheStore, SetOptions};

/// Namespaced key for an offline copy of `content_type`.
pub fn offline_key(content_type: &str) -> String {
    format!("{}{}", OFFLINE_KEY_PREFIX, content_type)
}

/// Long-lived offline copies plus the current connectivity state.
#[derive(Debug)]
pub struct OfflineContentManager<T> {
    store: Arc<CacheStore<T>>,
    online: AtomicBool,
}

impl<T> OfflineContentManager<T> {
    /// Starts in the online state.
    pub fn new(store: Arc<CacheStore<T>>) -> Self {
        Self {
            store,
            online: AtomicBool::new(true),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore<T>> {
        &self.store
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity::from(self.is_online())
    }

    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::AcqRel);
        if previous != online {
            tracing::info!(
                connectivity = %Connectivity::from(online),
                "Connectivity changed"
            );
        }
    }

    pub fn set_connectivity(&self, connectivity: Connectivity) {
        self.set_online(connectivity.is_online());
    }

    /// Store an offline copy under the offline namespace.
    ///
    /// The copy is written at critical priority with the configured offline
    /// TTL, whatever the priority of the content it mirrors.
    pub fn cache_for_offline(&self, content_type: &str, data: T) {
        let ttl = self.store.config().offline_ttl;
        self.store.set(
            offline_key(content_type),
            data,
            SetOptions::new()
                .with_priority(Priority::Critical)
                .with_ttl(ttl),
        );
        tracing::debug!(content_type = %content_type, "Cached content for offline use");
    }

    /// Whether a live (unexpired) offline copy exists.
    pub fn has_offline_content(&self, content_type: &str) -> bool {
        self.store.has(&offline_key(content_type))
    }

    pub fn remove_offline_content(&self, content_type: &str) -> bool {
        self.store.delete(&offline_key(content_type))
    }
}

impl<T: Clone> OfflineContentManager<T> {
    /// The offline copy, or `None` while online.
    pub fn get_offline_content(&self, content_type: &str) -> Option<T> {
        if self.is_online() {
            return None;
        }
        self.offline_copy(content_type)
    }

    /// The offline copy regardless of connectivity.
    pub fn offline_copy(&self, content_type: &str) -> Option<T> {
        self.store.get(&offline_key(content_type))
    }
}

impl<T: Send + Sync + 'static> OfflineContentManager<T> {
    /// Follow a connectivity signal until its sender is dropped.
    ///
    /// The current value of the receiver is applied immediately.
    pub fn listen(self: &Arc<Self>, mut signal: watch::Receiver<Connectivity>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let initial = *signal.borrow_and_update();
            manager.set_connectivity(initial);
            while signal.changed().await.is_ok() {
                let connectivity = *signal.borrow_and_update();
                manager.set_connectivity(connectivity);
            }
            tracing::debug!("Connectivity signal closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{CacheConfig, Clock, ManualClock};
    use serde_json::json;
    use std::time::Duration;

    fn manager() -> (OfflineContentManager<serde_json::Value>, ManualClock) {
        let clock = ManualClock::default();
        let config = CacheConfig::default().with_offline_ttl(Duration::from_secs(86_400));
        let store = Arc::new(CacheStore::new(config, Arc::new(clock.clone())));
        (OfflineContentManager::new(store), clock)
    }

    #[test]
    fn test_offline_key_prefix() {
        assert_eq!(offline_key("crisis-hotlines"), "offline-crisis-hotlines");
    }

    #[test]
    fn test_content_hidden_while_online() {
        let (manager, _) = manager();
        let payload = json!({"numbers": ["988"]});
        manager.cache_for_offline("x", payload.clone());

        assert!(manager.is_online());
        assert_eq!(manager.get_offline_content("x"), None);
        assert!(manager.has_offline_content("x"));

        manager.set_online(false);
        assert_eq!(manager.get_offline_content("x"), Some(payload.clone()));
        assert_eq!(manager.connectivity(), Connectivity::Offline);

        manager.set_online(true);
        assert_eq!(manager.offline_copy("x"), Some(payload));
    }

    #[test]
    fn test_offline_copy_uses_offline_ttl_and_critical_priority() {
        let (manager, clock) = manager();
        manager.cache_for_offline("safety-plan", json!("plan"));

        let meta = manager
            .store()
            .entry_metadata("offline-safety-plan")
            .unwrap();
        assert_eq!(meta.priority, Priority::Critical);
        assert_eq!(meta.ttl, Duration::from_secs(86_400));
        assert_eq!(meta.created_at, clock.now());
    }

    #[test]
    fn test_offline_copy_expires_after_a_day() {
        let (manager, clock) = manager();
        manager.set_online(false);
        manager.cache_for_offline("grief-articles", json!([1, 2, 3]));

        clock.advance(Duration::from_secs(86_400));
        assert!(manager.has_offline_content("grief-articles"));

        clock.advance(Duration::from_secs(1));
        assert!(!manager.has_offline_content("grief-articles"));
        assert_eq!(manager.get_offline_content("grief-articles"), None);
    }

    #[test]
    fn test_offline_namespace_does_not_collide() {
        let (manager, _) = manager();
        manager
            .store()
            .set("safety-plan", json!("fresh"), SetOptions::new());
        manager.cache_for_offline("safety-plan", json!("offline"));
        manager.set_online(false);

        assert_eq!(manager.store().get("safety-plan"), Some(json!("fresh")));
        assert_eq!(
            manager.get_offline_content("safety-plan"),
            Some(json!("offline"))
        );
        assert!(manager.remove_offline_content("safety-plan"));
        assert!(!manager.has_offline_content("safety-plan"));
    }

    #[tokio::test]
    async fn test_listen_follows_signal_until_closed() {
        let (manager, _) = manager();
        let manager = Arc::new(manager);
        let (tx, rx) = watch::channel(Connectivity::Offline);

        let handle = manager.listen(rx);
        tokio::task::yield_now().await;

        tx.send(Connectivity::Online).unwrap();
        tx.send(Connectivity::Offline).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(!manager.is_online());
    }
}
