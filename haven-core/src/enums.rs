//! Enum types shared across the cache and predictor

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PRIORITY TIERS
// ============================================================================

/// Priority tier of a cached resource.
///
/// Governs the default TTL of an entry and its eviction precedence.
/// Variants are declared lowest-first so the derived `Ord` matches
/// eviction order: `NiceToHave < Important < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    /// Evicted first, never proactively preloaded
    #[default]
    NiceToHave,
    /// Preloaded when a workflow pattern predicts it
    Important,
    /// Evicted last, preloaded eagerly
    Critical,
}

impl Priority {
    /// All tiers, highest first.
    pub const ALL: [Priority; 3] = [Priority::Critical, Priority::Important, Priority::NiceToHave];

    /// Numeric rank used for eviction ordering (critical=3, important=2, nice-to-have=1).
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 3,
            Priority::Important => 2,
            Priority::NiceToHave => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::Important => "important",
            Priority::NiceToHave => "nice-to-have",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "important" => Ok(Priority::Important),
            "nice-to-have" | "nice_to_have" | "nicetohave" => Ok(Priority::NiceToHave),
            _ => Err(EnumParseError::new("priority", s)),
        }
    }
}

// ============================================================================
// STRESS LEVEL
// ============================================================================

/// Derived classification of recent user behavior.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    #[default]
    Low,
    Moderate,
    High,
    Crisis,
}

impl StressLevel {
    /// Classify from the number of stress-indicating actions in the rolling window.
    ///
    /// 0 → low, 1 → moderate, 2–3 → high, 4+ → crisis.
    pub fn from_indicator_count(count: usize) -> Self {
        match count {
            0 => StressLevel::Low,
            1 => StressLevel::Moderate,
            2 | 3 => StressLevel::High,
            _ => StressLevel::Crisis,
        }
    }

    /// True for `High` and `Crisis`, the levels that trigger crisis preloading.
    pub fn is_elevated(&self) -> bool {
        matches!(self, StressLevel::High | StressLevel::Crisis)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Low => "low",
            StressLevel::Moderate => "moderate",
            StressLevel::High => "high",
            StressLevel::Crisis => "crisis",
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StressLevel {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(StressLevel::Low),
            "moderate" => Ok(StressLevel::Moderate),
            "high" => Ok(StressLevel::High),
            "crisis" => Ok(StressLevel::Crisis),
            _ => Err(EnumParseError::new("stress level", s)),
        }
    }
}

// ============================================================================
// CONNECTIVITY
// ============================================================================

/// Connectivity signal pushed by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Connectivity::Online => "online",
            Connectivity::Offline => "offline",
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<bool> for Connectivity {
    fn from(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }
}

/// Error returned when parsing an enum from an unknown string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    kind: &'static str,
    value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}
