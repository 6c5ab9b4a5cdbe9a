//! Error types for ZeroPhish

use thiserror::Error;

/// ZeroPhish error type
#[derive(Debug, Error)]
pub enum PhishError {
    /// Request rejected before processing
    #[error("validation error: {0}")]
    Validation(String),

    /// Upstream service failure (threat API, hosted store)
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Upstream call exceeded its deadline
    #[error("timeout: {0}")]
    Timeout(String),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl PhishError {
    /// True when the failure is a degradation of an optional collaborator
    /// rather than a caller mistake
    pub fn is_degradation(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Timeout(_))
    }
}

/// Result type for ZeroPhish
pub type PhishResult<T> = Result<T, PhishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradation_classification() {
        assert!(PhishError::Timeout("lookup".into()).is_degradation());
        assert!(PhishError::Upstream("503".into()).is_degradation());
        assert!(!PhishError::Validation("url".into()).is_degradation());
    }
}
