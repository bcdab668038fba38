//! HAVEN Core - Shared Types
//!
//! Priority tiers, stress levels, the injectable clock, the error taxonomy,
//! and configuration. No async, no I/O. All other crates depend on this.

pub mod clock;
pub mod config;
pub mod constants;
pub mod enums;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, HavenConfig, MatchStrategy, PredictorConfig};
pub use enums::{Connectivity, EnumParseError, Priority, StressLevel};
pub use error::{ConfigError, FetchError, HavenError, HavenResult};

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Elapsed time between two instants, clamped at zero when `later` precedes `earlier`.
pub fn elapsed_between(earlier: Timestamp, later: Timestamp) -> Duration {
    later
        .signed_duration_since(earlier)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
