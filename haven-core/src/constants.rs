//! Constants for HAVEN
//!
//! Default values for cache sizing, TTLs, intervals, and predictor tuning.

// ============================================================================
// CACHE STORE
// ============================================================================

/// Default maximum number of entries in the cache store
pub const DEFAULT_CACHE_MAX_SIZE: usize = 100;

/// Default TTL for important and nice-to-have entries in seconds (5 minutes)
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default TTL for critical entries in seconds (30 minutes)
pub const DEFAULT_CRITICAL_TTL_SECS: u64 = 1800;

/// Default background sweep interval in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

// ============================================================================
// OFFLINE CONTENT
// ============================================================================

/// Key prefix for offline copies
pub const OFFLINE_KEY_PREFIX: &str = "offline-";

/// TTL for offline copies in seconds (24 hours)
pub const DEFAULT_OFFLINE_TTL_SECS: u64 = 86_400;

// ============================================================================
// FETCHING
// ============================================================================

/// Default per-fetch deadline in milliseconds
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

// ============================================================================
// PREDICTOR
// ============================================================================

/// Number of most recent actions used for stress classification
pub const DEFAULT_STRESS_WINDOW: usize = 5;

/// Number of actions retained in the session history
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// TTL for resources preloaded by a critical-tier pattern in seconds (1 hour)
pub const CRITICAL_TIER_TTL_SECS: u64 = 3600;

/// TTL for resources preloaded by an important-tier pattern in seconds (30 minutes)
pub const IMPORTANT_TIER_TTL_SECS: u64 = 1800;
