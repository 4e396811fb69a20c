// Authentication configuration loaded from environment variables.
// Decision: Default to "none" mode for local development
// Decision: "header" mode trusts an upstream gateway to set X-User-Id

/// Header carrying the authenticated user id in `header` mode.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// No authentication required (local development).
    /// Every request acts as the anonymous user.
    #[default]
    None,
    /// User id taken from the `X-User-Id` header
    Header,
}

impl AuthMode {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "header" => AuthMode::Header,
            _ => AuthMode::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Header => "header",
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Authentication mode
    pub mode: AuthMode,
}

impl AuthConfig {
    pub fn new(mode: AuthMode) -> Self {
        Self { mode }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mode = lookup("AUTH_MODE")
            .map(|s| AuthMode::from_str(&s))
            .unwrap_or_default();
        Self { mode }
    }
}
