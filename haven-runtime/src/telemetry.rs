//! Tracing subscriber setup.

use std::fmt;
use std::str::FromStr;

use haven_core::{ConfigError, HavenResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "haven=debug,info";

/// Output format of the `fmt` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Pretty => f.write_str("pretty"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::InvalidValue {
                field: "log_format".to_string(),
                value: other.to_string(),
                reason: "expected 'json' or 'pretty'".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Output format
    pub format: LogFormat,
    /// Filter directives used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "haven".to_string(),
            format: LogFormat::Json,
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// # Environment Variables
    /// - `HAVEN_SERVICE_NAME`: service name (default: haven)
    /// - `HAVEN_LOG_FORMAT`: `json` or `pretty` (default: json)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("HAVEN_SERVICE_NAME").unwrap_or(defaults.service_name),
            format: std::env::var("HAVEN_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.format),
            default_filter: defaults.default_filter,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call fails because a global subscriber is
/// already set.
pub fn init_tracing(config: &TelemetryConfig) -> HavenResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    installed.map_err(|e| ConfigError::InvalidValue {
        field: "tracing_subscriber".to_string(),
        value: config.format.to_string(),
        reason: format!("Failed to init subscriber: {}", e),
    })?;

    tracing::info!(
        service_name = %config.service_name,
        format = %config.format,
        "Telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::HavenError;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_telemetry_config_from_env() {
        {
            let _name = EnvVarGuard::set("HAVEN_SERVICE_NAME", Some("haven-web"));
            let _format = EnvVarGuard::set("HAVEN_LOG_FORMAT", Some("pretty"));
            let config = TelemetryConfig::from_env();
            assert_eq!(config.service_name, "haven-web");
            assert_eq!(config.format, LogFormat::Pretty);
            assert_eq!(config.default_filter, DEFAULT_LOG_FILTER);
        }
        {
            let _name = EnvVarGuard::set("HAVEN_SERVICE_NAME", None);
            let _format = EnvVarGuard::set("HAVEN_LOG_FORMAT", Some("yaml"));
            assert_eq!(TelemetryConfig::from_env(), TelemetryConfig::default());
        }
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig::default().with_format(LogFormat::Pretty);
        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(HavenError::Config(_))));
    }
}
