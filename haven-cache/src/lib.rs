//! HAVEN Cache - Resource Caching Layer
//!
//! - [`CacheStore`]: bounded priority/TTL store with lazy expiry
//! - [`CacheSweeper`]: background task removing expired entries on an interval
//! - [`OfflineContentManager`]: long-lived offline copies gated on connectivity
//! - [`CriticalResourceLoader`]: concurrent all-settled preloading with
//!   per-fetch timeout and cancellation
//!
//! A single `CacheStore` is built per application and shared through `Arc`
//! by everything else in this crate.

pub mod offline;
pub mod preload;
pub mod store;
pub mod sweeper;

pub use offline::{offline_key, OfflineContentManager};
pub use preload::{
    CriticalResourceLoader, FnFetcher, PreloadPlan, PreloadResult, ResourceDescriptor,
    ResourceFetcher,
};
pub use store::{CacheStats, CacheStore, EntryMetadata, SetOptions};
pub use sweeper::{CacheSweeper, SweepMetrics, SweepSnapshot};
