//! Error types for conversation storage.

use thiserror::Error;

/// Errors from conversation store operations (used by the trait definition
/// in `parley-core`).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistence layer is unreachable or failing at the connection
    /// level. Health checks report this as a degraded component.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A query failed for reasons other than availability.
    #[error("query error: {0}")]
    Query(String),

    /// The requested conversation does not exist. Never retried.
    #[error("conversation not found")]
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
        assert_eq!(StoreError::NotFound.to_string(), "conversation not found");
    }
}
