// Server configuration loading
//
// All settings come from environment variables (optionally seeded from a
// .env file by the binary). Malformed numeric values fall back to their
// defaults with a warning rather than refusing to start.

use std::time::Duration;
use studio_core::hub::{DEFAULT_CONNECTION_BUFFER, DEFAULT_HEARTBEAT_INTERVAL};
use studio_core::HubConfig;

use crate::auth::AuthConfig;

/// Default HTTP listen address
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3001";

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PostgreSQL URL. `None` runs on the in-memory dev backend.
    pub database_url: Option<String>,
    /// HTTP listen address
    pub http_addr: String,
    /// Prefix for all API routes (e.g. "/api"). Empty means none.
    pub api_prefix: String,
    /// Origins allowed by CORS. Empty means same-origin only.
    pub cors_allowed_origins: Vec<String>,
    /// Heartbeat interval on idle streams
    pub sse_heartbeat: Duration,
    /// Frames buffered per stream before it is dropped as too slow
    pub sse_connection_buffer: usize,
    /// Authentication configuration
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            api_prefix: String::new(),
            cors_allowed_origins: Vec::new(),
            sse_heartbeat: DEFAULT_HEARTBEAT_INTERVAL,
            sse_connection_buffer: DEFAULT_CONNECTION_BUFFER,
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DATABASE_URL`: PostgreSQL URL (unset: in-memory dev mode)
    /// - `HTTP_ADDR`: Listen address (default: "0.0.0.0:3001")
    /// - `API_PREFIX`: Route prefix, e.g. "/api"
    /// - `CORS_ALLOWED_ORIGINS`: Comma-separated origins
    /// - `SSE_HEARTBEAT_SECS`: Heartbeat interval (default: 15)
    /// - `SSE_CONNECTION_BUFFER`: Per-stream buffer (default: 256)
    /// - `AUTH_MODE`: "none" or "header"
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let sse_heartbeat = non_empty("SSE_HEARTBEAT_SECS")
            .and_then(|v| parse_or_warn::<u64>("SSE_HEARTBEAT_SECS", &v))
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.sse_heartbeat);

        let sse_connection_buffer = non_empty("SSE_CONNECTION_BUFFER")
            .and_then(|v| parse_or_warn::<usize>("SSE_CONNECTION_BUFFER", &v))
            .filter(|n| *n > 0)
            .unwrap_or(defaults.sse_connection_buffer);

        Self {
            database_url: non_empty("DATABASE_URL"),
            http_addr: non_empty("HTTP_ADDR").unwrap_or(defaults.http_addr),
            api_prefix: non_empty("API_PREFIX")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            cors_allowed_origins: non_empty("CORS_ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            sse_heartbeat,
            sse_connection_buffer,
            auth: AuthConfig::from_lookup(&lookup),
        }
    }

    /// Hub settings derived from the SSE options
    pub fn hub_config(&self) -> HubConfig {
        HubConfig::default()
            .with_heartbeat_interval(self.sse_heartbeat)
            .with_connection_buffer(self.sse_connection_buffer)
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value, "Ignoring malformed configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthMode;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert!(c.database_url.is_none());
        assert_eq!(c.http_addr, "0.0.0.0:3001");
        assert_eq!(c.api_prefix, "");
        assert!(c.cors_allowed_origins.is_empty());
        assert_eq!(c.sse_heartbeat, Duration::from_secs(15));
        assert_eq!(c.sse_connection_buffer, 256);
        assert_eq!(c.auth.mode, AuthMode::None);
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("DATABASE_URL", "postgres://localhost/studio"),
            ("HTTP_ADDR", "127.0.0.1:8080"),
            ("API_PREFIX", "/api/"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example.com, https://b.example.com,"),
            ("SSE_HEARTBEAT_SECS", "5"),
            ("SSE_CONNECTION_BUFFER", "16"),
            ("AUTH_MODE", "header"),
        ]);
        assert_eq!(c.database_url.as_deref(), Some("postgres://localhost/studio"));
        assert_eq!(c.http_addr, "127.0.0.1:8080");
        assert_eq!(c.api_prefix, "/api");
        assert_eq!(
            c.cors_allowed_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert_eq!(c.auth.mode, AuthMode::Header);

        let hub = c.hub_config();
        assert_eq!(hub.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(hub.connection_buffer, 16);
    }

    #[test]
    fn test_malformed_numbers_fall_back() {
        let c = config(&[
            ("SSE_HEARTBEAT_SECS", "soon"),
            ("SSE_CONNECTION_BUFFER", "0"),
            ("DATABASE_URL", "  "),
        ]);
        assert_eq!(c.sse_heartbeat, Duration::from_secs(15));
        assert_eq!(c.sse_connection_buffer, 256);
        assert!(c.database_url.is_none());
    }
}
