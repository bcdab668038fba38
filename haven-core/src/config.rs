//! Configuration types
//!
//! Loaded from `HAVEN_*` environment variables with defaults from
//! [`crate::constants`]. Unparseable values fall back to the default.

use crate::constants::*;
use crate::error::ConfigError;
use crate::Priority;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn require_nonzero(field: &str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: format!("{:?}", value),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

/// Configuration for the cache store, sweeper, offline layer, and loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held at once.
    pub max_size: usize,
    /// TTL for important and nice-to-have entries without an override.
    pub default_ttl: Duration,
    /// TTL for critical entries without an override.
    pub critical_ttl: Duration,
    /// How often the background sweep removes expired entries.
    pub sweep_interval: Duration,
    /// TTL for offline copies, regardless of the content's own priority.
    pub offline_ttl: Duration,
    /// Deadline for a single resource fetch.
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_CACHE_MAX_SIZE,
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            critical_ttl: Duration::from_secs(DEFAULT_CRITICAL_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            offline_ttl: Duration::from_secs(DEFAULT_OFFLINE_TTL_SECS),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `HAVEN_CACHE_MAX_SIZE`: Maximum entries (default: 100)
    /// - `HAVEN_CACHE_DEFAULT_TTL_SECS`: TTL for non-critical entries (default: 300)
    /// - `HAVEN_CACHE_CRITICAL_TTL_SECS`: TTL for critical entries (default: 1800)
    /// - `HAVEN_CACHE_SWEEP_INTERVAL_SECS`: Background sweep interval (default: 60)
    /// - `HAVEN_OFFLINE_TTL_SECS`: TTL for offline copies (default: 86400)
    /// - `HAVEN_FETCH_TIMEOUT_MS`: Per-fetch deadline (default: 10000)
    pub fn from_env() -> Self {
        Self {
            max_size: env_parse("HAVEN_CACHE_MAX_SIZE").unwrap_or(DEFAULT_CACHE_MAX_SIZE),
            default_ttl: Duration::from_secs(
                env_parse("HAVEN_CACHE_DEFAULT_TTL_SECS").unwrap_or(DEFAULT_TTL_SECS),
            ),
            critical_ttl: Duration::from_secs(
                env_parse("HAVEN_CACHE_CRITICAL_TTL_SECS").unwrap_or(DEFAULT_CRITICAL_TTL_SECS),
            ),
            sweep_interval: Duration::from_secs(
                env_parse("HAVEN_CACHE_SWEEP_INTERVAL_SECS").unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
            ),
            offline_ttl: Duration::from_secs(
                env_parse("HAVEN_OFFLINE_TTL_SECS").unwrap_or(DEFAULT_OFFLINE_TTL_SECS),
            ),
            fetch_timeout: Duration::from_millis(
                env_parse("HAVEN_FETCH_TIMEOUT_MS").unwrap_or(DEFAULT_FETCH_TIMEOUT_MS),
            ),
        }
    }

    /// Set the maximum number of entries.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the TTL for non-critical entries.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the TTL for critical entries.
    pub fn with_critical_ttl(mut self, ttl: Duration) -> Self {
        self.critical_ttl = ttl;
        self
    }

    /// Set the background sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the offline copy TTL.
    pub fn with_offline_ttl(mut self, ttl: Duration) -> Self {
        self.offline_ttl = ttl;
        self
    }

    /// Set the per-fetch deadline.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// TTL applied to an entry of the given priority when no override is supplied.
    pub fn ttl_for(&self, priority: Priority) -> Duration {
        match priority {
            Priority::Critical => self.critical_ttl,
            Priority::Important | Priority::NiceToHave => self.default_ttl,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_size".to_string(),
                value: self.max_size.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        require_nonzero("default_ttl", self.default_ttl)?;
        require_nonzero("critical_ttl", self.critical_ttl)?;
        require_nonzero("sweep_interval", self.sweep_interval)?;
        require_nonzero("offline_ttl", self.offline_ttl)?;
        require_nonzero("fetch_timeout", self.fetch_timeout)?;
        Ok(())
    }
}

// ============================================================================
// PREDICTOR CONFIGURATION
// ============================================================================

/// How tracked actions are matched against pattern trigger tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// The action must equal one of the trigger tags.
    #[default]
    Exact,
    /// The action contains a trigger tag, or a trigger tag contains the action.
    Substring,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Exact => f.write_str("exact"),
            MatchStrategy::Substring => f.write_str("substring"),
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchStrategy::Exact),
            "substring" => Ok(MatchStrategy::Substring),
            other => Err(ConfigError::InvalidValue {
                field: "match_strategy".to_string(),
                value: other.to_string(),
                reason: "expected 'exact' or 'substring'".to_string(),
            }),
        }
    }
}

/// Configuration for the workflow predictor and stress estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Number of most recent actions considered for stress classification.
    pub stress_window: usize,
    /// Number of actions retained in the session history.
    pub history_limit: usize,
    /// TTL for resources preloaded by a critical-tier pattern.
    pub critical_tier_ttl: Duration,
    /// TTL for resources preloaded by an important-tier pattern.
    pub important_tier_ttl: Duration,
    /// Trigger matching strategy.
    pub match_strategy: MatchStrategy,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            stress_window: DEFAULT_STRESS_WINDOW,
            history_limit: DEFAULT_HISTORY_LIMIT,
            critical_tier_ttl: Duration::from_secs(CRITICAL_TIER_TTL_SECS),
            important_tier_ttl: Duration::from_secs(IMPORTANT_TIER_TTL_SECS),
            match_strategy: MatchStrategy::Exact,
        }
    }
}

impl PredictorConfig {
    /// Create PredictorConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `HAVEN_STRESS_WINDOW`: Rolling window size (default: 5)
    /// - `HAVEN_HISTORY_LIMIT`: Session history length (default: 50)
    /// - `HAVEN_MATCH_STRATEGY`: `exact` or `substring` (default: exact)
    pub fn from_env() -> Self {
        Self {
            stress_window: env_parse("HAVEN_STRESS_WINDOW").unwrap_or(DEFAULT_STRESS_WINDOW),
            history_limit: env_parse("HAVEN_HISTORY_LIMIT").unwrap_or(DEFAULT_HISTORY_LIMIT),
            match_strategy: env_parse("HAVEN_MATCH_STRATEGY").unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Set the trigger matching strategy.
    pub fn with_match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.match_strategy = strategy;
        self
    }

    /// Set the rolling stress window size.
    pub fn with_stress_window(mut self, window: usize) -> Self {
        self.stress_window = window;
        self
    }

    /// Set the session history length.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// TTL for resources preloaded on behalf of a pattern of the given tier.
    ///
    /// Returns `None` for nice-to-have, which is never proactively preloaded.
    pub fn tier_ttl(&self, priority: Priority) -> Option<Duration> {
        match priority {
            Priority::Critical => Some(self.critical_tier_ttl),
            Priority::Important => Some(self.important_tier_ttl),
            Priority::NiceToHave => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stress_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stress_window".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.history_limit < self.stress_window {
            return Err(ConfigError::IncompatibleOptions {
                option_a: format!("history_limit={}", self.history_limit),
                option_b: format!("stress_window={}", self.stress_window),
            });
        }
        require_nonzero("critical_tier_ttl", self.critical_tier_ttl)?;
        require_nonzero("important_tier_ttl", self.important_tier_ttl)?;
        Ok(())
    }
}

// ============================================================================
// MASTER CONFIGURATION
// ============================================================================

/// Master configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HavenConfig {
    pub cache: CacheConfig,
    pub predictor: PredictorConfig,
}

impl HavenConfig {
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            predictor: PredictorConfig::from_env(),
        }
    }

    /// Shorter intervals and TTLs for development and testing.
    pub fn development() -> Self {
        Self {
            cache: CacheConfig::default()
                .with_max_size(32)
                .with_default_ttl(Duration::from_secs(30))
                .with_critical_ttl(Duration::from_secs(120))
                .with_sweep_interval(Duration::from_secs(5))
                .with_fetch_timeout(Duration::from_secs(2)),
            predictor: PredictorConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.predictor.validate()
    }
}
