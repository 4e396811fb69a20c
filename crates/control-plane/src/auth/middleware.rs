// Authentication extractors
// Decision: In "none" mode, create an anonymous user context
// Decision: Route states expose AuthState through axum's FromRef

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::config::{AuthConfig, AuthMode, USER_ID_HEADER};

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Authenticated user context extracted from request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// User ID. Records are owned by and streamed to this id.
    pub id: Uuid,
    /// Authentication method used
    pub auth_method: AuthMethod,
}

impl AuthUser {
    /// Create an anonymous user for no-auth mode
    pub fn anonymous() -> Self {
        Self {
            id: Uuid::nil(),
            auth_method: AuthMethod::None,
        }
    }
}

/// Authentication method used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// No authentication (anonymous)
    None,
    /// Trusted gateway header
    Header,
}

/// Auth state shared across routes
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub config: AuthConfig,
}

impl AuthState {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

/// Extractor for authenticated user
/// This is required - returns 401 if not authenticated
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        extract_auth_user(parts, &auth_state)
    }
}

/// Extract authenticated user from request
fn extract_auth_user(parts: &Parts, auth_state: &AuthState) -> Result<AuthUser, AuthError> {
    // In no-auth mode, always return anonymous user
    if auth_state.config.mode == AuthMode::None {
        return Ok(AuthUser::anonymous());
    }

    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;

    let id = raw
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| {
            tracing::debug!("Rejected malformed {} header", USER_ID_HEADER);
            AuthError::unauthorized("Invalid user id")
        })?;

    Ok(AuthUser {
        id,
        auth_method: AuthMethod::Header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/tasks");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn header_state() -> AuthState {
        AuthState::new(AuthConfig::new(AuthMode::Header))
    }

    #[test]
    fn test_none_mode_is_anonymous() {
        let user = extract_auth_user(&parts(None), &AuthState::default()).unwrap();
        assert_eq!(user, AuthUser::anonymous());
        assert!(user.id.is_nil());
    }

    #[test]
    fn test_header_mode_reads_user_id() {
        let id = Uuid::now_v7();
        let user = extract_auth_user(&parts(Some(&id.to_string())), &header_state()).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.auth_method, AuthMethod::Header);
    }

    #[test]
    fn test_header_mode_requires_header() {
        let err = extract_auth_user(&parts(None), &header_state()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = extract_auth_user(&parts(Some("not-a-uuid")), &header_state()).unwrap_err();
        assert_eq!(err.error, "Invalid user id");
    }
}
