// Error types for event delivery

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for hub and record operations
pub type Result<T> = std::result::Result<T, HubError>;

/// Errors that can occur while producing or delivering records
#[derive(Debug, Error)]
pub enum HubError {
    /// Record does not exist or is not owned by the requesting user
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    /// The record store could not be reached or rejected the operation
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// A single stream write failed (peer gone or buffer full)
    #[error("Transport write failed: {0}")]
    TransportWrite(String),

    /// The hub no longer accepts new streams
    #[error("Event stream hub is shutting down")]
    ShuttingDown,

    /// Frame payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HubError {
    /// Create a not found error for a record kind
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        HubError::NotFound { kind, id }
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        HubError::StoreUnavailable(msg.into())
    }

    /// Create a transport write error
    pub fn transport(msg: impl Into<String>) -> Self {
        HubError::TransportWrite(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HubError::NotFound { .. })
    }
}

impl From<anyhow::Error> for HubError {
    fn from(err: anyhow::Error) -> Self {
        HubError::StoreUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let id = Uuid::nil();
        let err = HubError::not_found("Notification", id);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Notification not found: 00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_anyhow_maps_to_store_unavailable() {
        let err: HubError = anyhow::anyhow!("connection refused").into();
        assert!(matches!(err, HubError::StoreUnavailable(ref m) if m == "connection refused"));
    }
}
