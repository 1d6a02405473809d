//! Unified error types for the domain layer
//!
//! Provides a common error type for value-object construction and parsing,
//! so adapters never have to fall back to `String` errors.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// Use this when a value object is constructed from input that breaks
    /// one of its invariants (empty text, text over the length limit).
    ///
    /// # Example
    /// ```ignore
    /// if description.trim().is_empty() {
    ///     return Err(DomainError::validation("Request description cannot be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Use this in `FromStr` implementations when the input string
    /// doesn't match any known variant.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid state transition error
    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("description cannot be empty");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation failed: description cannot be empty"
        );
    }

    #[test]
    fn test_parse_error() {
        let err = DomainError::parse("Unknown approval state: frozen");
        assert!(matches!(err, DomainError::Parse(_)));
        assert_eq!(err.to_string(), "Parse error: Unknown approval state: frozen");
    }

    #[test]
    fn test_invalid_state_transition_error() {
        let err = DomainError::invalid_state_transition("Approved -> Denied");
        assert_eq!(err.to_string(), "Invalid state transition: Approved -> Denied");
    }
}
