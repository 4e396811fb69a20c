// HTTP API routes
//
// This module contains all HTTP route handlers for the public API.
// Each submodule handles a specific resource type with its own AppState.

pub mod common;
pub mod error;
pub mod health;
pub mod notifications;
pub mod sse;
pub mod tasks;

// Re-export common types
pub use common::{ErrorResponse, ListResponse};
pub use error::ApiError;
