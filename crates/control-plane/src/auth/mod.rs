// Current-user resolution for API routes

pub mod config;
pub mod middleware;

pub use config::{AuthConfig, AuthMode, USER_ID_HEADER};
pub use middleware::{AuthError, AuthMethod, AuthState, AuthUser};
