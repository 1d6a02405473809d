//! Approval vocabulary for service requests.
//!
//! The request lifecycle is owned by the application under test:
//!
//! ```text
//! Submitted -> Pending Approval -> Approved
//!                               \-> Denied
//! ```
//!
//! `Submitted` is transient and never reported on a request row, so it has
//! no variant here. The earliest state an observer can rely on is
//! `Pending Approval`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;
use crate::value_objects::description::RETIREMENT_PREFIX;
use crate::value_objects::RequestDescription;

// ============================================================================
// ApprovalState
// ============================================================================

/// Approval state of a request as reported by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    PendingApproval,
    Approved,
    Denied,
}

impl ApprovalState {
    /// Text shown in the requests table.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PendingApproval => "Pending Approval",
            Self::Approved => "Approved",
            Self::Denied => "Denied",
        }
    }

    /// Whether a decision may still be submitted for a request in this state.
    pub fn accepts_decision(&self) -> bool {
        matches!(self, Self::PendingApproval)
    }

    /// State a pending request moves to once `decision` is applied.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the request is no
    /// longer pending.
    pub fn apply(self, decision: ApprovalDecision) -> Result<Self, DomainError> {
        if !self.accepts_decision() {
            return Err(DomainError::invalid_state_transition(format!(
                "cannot {} a request that is {}",
                decision.verb(),
                self
            )));
        }
        Ok(decision.outcome())
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for ApprovalState {
    type Err = DomainError;

    /// Accepts both the table text (`Pending Approval`) and the API
    /// spelling (`pending_approval`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "pending approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            _ => Err(DomainError::parse(format!("Unknown approval state: {}", s))),
        }
    }
}

// ============================================================================
// ObservedState
// ============================================================================

/// One reading of a request's approval state.
///
/// `Unknown` means no request row matched the description yet. It is a
/// reading like any other, not an error: the row may simply not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "state", rename_all = "snake_case")]
pub enum ObservedState {
    Known(ApprovalState),
    Unknown,
}

impl ObservedState {
    pub fn is(&self, expected: ApprovalState) -> bool {
        matches!(self, Self::Known(state) if *state == expected)
    }
}

impl From<ApprovalState> for ObservedState {
    fn from(state: ApprovalState) -> Self {
        Self::Known(state)
    }
}

impl From<Option<ApprovalState>> for ObservedState {
    fn from(state: Option<ApprovalState>) -> Self {
        state.map_or(Self::Unknown, Self::Known)
    }
}

impl fmt::Display for ObservedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(state) => write!(f, "{}", state),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

// ============================================================================
// ApprovalDecision
// ============================================================================

/// Decision an approver submits for a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Deny,
}

impl ApprovalDecision {
    /// Action name accepted by the REST API.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
        }
    }

    /// Terminal state this decision produces.
    pub fn outcome(&self) -> ApprovalState {
        match self {
            Self::Approve => ApprovalState::Approved,
            Self::Deny => ApprovalState::Denied,
        }
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb())
    }
}

// ============================================================================
// ApprovalType
// ============================================================================

/// Approval mode configured on a request-approval state machine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    #[default]
    Auto,
    Manual,
}

impl ApprovalType {
    /// State a freshly submitted request is first observed in.
    pub fn initial_state(&self) -> ApprovalState {
        match self {
            Self::Auto => ApprovalState::Approved,
            Self::Manual => ApprovalState::PendingApproval,
        }
    }
}

impl fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for ApprovalType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(DomainError::parse(format!("Unknown approval type: {}", s))),
        }
    }
}

// ============================================================================
// RequestKind
// ============================================================================

/// The kinds of request that pass through an approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    /// Ordering a catalog item. The request carries the item's name.
    ServiceProvision { catalog_item: String },
    /// Retiring an ordered service.
    ServiceRetirement { service_name: String },
}

impl RequestKind {
    /// Description the application writes on the request row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the underlying name is empty.
    pub fn description(&self) -> Result<RequestDescription, DomainError> {
        match self {
            Self::ServiceProvision { catalog_item } => RequestDescription::new(catalog_item.as_str()),
            Self::ServiceRetirement { service_name } => {
                if service_name.trim().is_empty() {
                    return Err(DomainError::validation("Service name cannot be empty"));
                }
                RequestDescription::new(format!("{}{}", RETIREMENT_PREFIX, service_name.trim()))
            }
        }
    }

    /// Name of the automate class whose `approval_type` governs this kind.
    pub fn approval_class(&self) -> &'static str {
        match self {
            Self::ServiceProvision { .. } => "ServiceProvisionRequestApproval",
            Self::ServiceRetirement { .. } => "ServiceRetirementRequestApproval",
        }
    }
}
