//! Request descriptions and how they are matched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum length for a request description
const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Prefix the application puts on service retirement requests.
pub const RETIREMENT_PREFIX: &str = "Service Retire for: ";

// ============================================================================
// RequestDescription
// ============================================================================

/// A validated request description (non-empty, <=1000 chars, trimmed).
///
/// The application under test correlates a submitted workflow with its
/// request row only through this text, so it doubles as the lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestDescription(String);

impl RequestDescription {
    /// Create a new validated request description.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - The description is empty after trimming
    /// - The description exceeds 1000 characters after trimming
    pub fn new(description: impl Into<String>) -> Result<Self, DomainError> {
        let description = description.into();
        let trimmed = description.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation(
                "Request description cannot be empty",
            ));
        }
        if trimmed.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(DomainError::validation(format!(
                "Request description cannot exceed {} characters",
                MAX_DESCRIPTION_LENGTH
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the description as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this describes a service retirement request.
    pub fn is_retirement(&self) -> bool {
        self.0.starts_with(RETIREMENT_PREFIX)
    }

    /// Whether a request row's description is a match under `mode`.
    pub fn matches(&self, candidate: &str, mode: DescriptionMatch) -> bool {
        match mode {
            DescriptionMatch::Exact => candidate == self.0,
            DescriptionMatch::Partial => candidate.contains(self.0.as_str()),
        }
    }
}

impl fmt::Display for RequestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RequestDescription {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for RequestDescription {
    type Error = DomainError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RequestDescription> for String {
    fn from(description: RequestDescription) -> String {
        description.0
    }
}

// ============================================================================
// DescriptionMatch
// ============================================================================

/// How a description is compared against request rows.
///
/// Request rows often carry a longer description than the one the caller
/// knows (e.g. a catalog item name embedded in a generated sentence), so
/// partial matching is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionMatch {
    Exact,
    #[default]
    Partial,
}
