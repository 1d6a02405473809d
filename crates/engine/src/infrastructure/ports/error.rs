//! Error types for port operations.

use gatewatch_domain::ObservedState;

/// Failures reading state from the application under test.
///
/// A request that does not exist yet is NOT an error; sources report it as
/// `ObservedState::Unknown`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StatusSourceError {
    /// Transport-level failure - includes operation name for tracing.
    #[error("Status query failed in {operation}: {message}")]
    RequestFailed {
        operation: &'static str,
        message: String,
    },

    /// The source answered with something that could not be interpreted.
    #[error("Invalid status response: {0}")]
    InvalidResponse(String),
}

impl StatusSourceError {
    /// Create a RequestFailed error with operation context.
    pub fn request_failed(operation: &'static str, message: impl ToString) -> Self {
        Self::RequestFailed {
            operation,
            message: message.to_string(),
        }
    }

    /// Create an InvalidResponse error.
    pub fn invalid_response(message: impl ToString) -> Self {
        Self::InvalidResponse(message.to_string())
    }
}

/// Failures submitting an approval decision.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActuatorError {
    /// The request is not waiting for a decision (already resolved, or not
    /// found). Never retried.
    #[error("Request '{description}' is not approvable (current state: {current})")]
    NotApprovable {
        description: String,
        current: ObservedState,
    },

    #[error("Decision request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid decision response: {0}")]
    InvalidResponse(String),
}

impl ActuatorError {
    pub fn not_approvable(description: impl ToString, current: ObservedState) -> Self {
        Self::NotApprovable {
            description: description.to_string(),
            current,
        }
    }
}
