//! Migration plan progress as reported by the V2V plan listing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// State of a VM migration plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPlanState {
    Started,
    InProgress,
    Completed,
    Successful,
    Failed,
}

impl MigrationPlanState {
    /// Milestones a healthy plan passes through, in order.
    pub const SMOKE_SEQUENCE: [MigrationPlanState; 4] = [
        Self::Started,
        Self::InProgress,
        Self::Completed,
        Self::Successful,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::InProgress => "In_Progress",
            Self::Completed => "Completed",
            Self::Successful => "Successful",
            Self::Failed => "Failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for MigrationPlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for MigrationPlanState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "started" => Ok(Self::Started),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "successful" => Ok(Self::Successful),
            "failed" => Ok(Self::Failed),
            _ => Err(DomainError::parse(format!(
                "Unknown migration plan state: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_listing_spellings() {
        assert_eq!(
            MigrationPlanState::from_str("In_Progress").unwrap(),
            MigrationPlanState::InProgress
        );
        assert_eq!(
            MigrationPlanState::from_str("in progress").unwrap(),
            MigrationPlanState::InProgress
        );
        assert!(MigrationPlanState::from_str("queued").is_err());
    }

    #[test]
    fn smoke_sequence_ends_successful() {
        assert_eq!(
            MigrationPlanState::SMOKE_SEQUENCE.last(),
            Some(&MigrationPlanState::Successful)
        );
        assert!(MigrationPlanState::SMOKE_SEQUENCE
            .iter()
            .all(|state| !state.is_failure()));
    }
}
