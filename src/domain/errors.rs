//! Domain Errors
//!
//! Failures that can cross a port boundary. None of them is fatal to a
//! resolution: the application layer turns every one into an unavailable
//! source and moves down the priority chain.

use std::time::Duration;

/// Failure of a store or IP sub-lookup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LookupError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_display() {
        let err = LookupError::Unavailable("database is locked".to_string());
        assert_eq!(err.to_string(), "source unavailable: database is locked");

        let err = LookupError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "lookup timed out after 250ms");
    }
}
