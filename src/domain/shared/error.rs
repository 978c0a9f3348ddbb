//! Domain errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Store unavailable or a constraint (duplicate call id) was violated.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The telephony provider rejected an origination or termination.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A required field was missing or unparseable.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DomainError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Persistence(_) => "persistence",
            DomainError::Provider(_) => "provider",
            DomainError::MalformedInput(_) => "malformed_input",
            DomainError::NotFound(_) => "not_found",
            DomainError::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::Provider("call CAabc is not in-progress".to_string());
        assert_eq!(err.to_string(), "Provider error: call CAabc is not in-progress");
        assert_eq!(err.kind(), "provider");
    }
}
