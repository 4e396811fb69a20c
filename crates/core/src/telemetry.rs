// Telemetry Module
//
// Structured logging setup shared by the binaries. Log lines carry the
// fields `user_id`, `connection_id` and `record_id` where they apply, so a
// single stream or record can be followed through connect, dispatch and
// teardown.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when neither `RUST_LOG` nor `LOG_LEVEL` is set.
pub const DEFAULT_LOG_FILTER: &str = "studio_control_plane=debug,tower_http=debug";

/// Configuration for logging
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name, emitted once at startup
    pub service_name: String,
    /// Environment (e.g., "development", "production")
    pub environment: Option<String>,
    /// Whether to enable console logging
    pub enable_console: bool,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Log filter (e.g., "info", "debug", "studio_core=debug")
    pub log_filter: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "studio".to_string(),
            environment: None,
            enable_console: true,
            json: false,
            log_filter: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `SERVICE_NAME`: Service name (default: "studio")
    /// - `ENVIRONMENT`: Deployment environment
    /// - `LOG_FORMAT`: "json" for JSON lines
    /// - `RUST_LOG` or `LOG_LEVEL`: Log filter
    pub fn from_env() -> Self {
        Self {
            service_name: std::env::var("SERVICE_NAME").unwrap_or_else(|_| "studio".to_string()),
            environment: std::env::var("ENVIRONMENT").ok(),
            enable_console: true,
            json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            log_filter: std::env::var("RUST_LOG")
                .ok()
                .or_else(|| std::env::var("LOG_LEVEL").ok()),
        }
    }

    /// Resolve the configured filter, falling back to [`DEFAULT_LOG_FILTER`]
    /// when unset or unparseable.
    pub fn env_filter(&self) -> EnvFilter {
        self.log_filter
            .as_deref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Install the global subscriber.
///
/// Calling this more than once (e.g. from several tests) is harmless: only
/// the first call installs a subscriber.
///
/// ```ignore
/// use studio_core::telemetry::{init_telemetry, TelemetryConfig};
///
/// #[tokio::main]
/// async fn main() {
///     init_telemetry(TelemetryConfig::from_env());
///     // ... your application code
/// }
/// ```
pub fn init_telemetry(config: TelemetryConfig) {
    let console_layer = if config.enable_console {
        let layer = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_filter(config.env_filter())
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(config.env_filter())
                .boxed()
        };
        Some(layer)
    } else {
        None
    };

    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!(
            service = %config.service_name,
            environment = config.environment.as_deref().unwrap_or("unknown"),
            "Logging initialized"
        );
    }
}
