//! Ports onto the application under test.
//!
//! The verifier never owns request or plan state. It reads it through these
//! traits and, for approvals, asks the application to change it.

use async_trait::async_trait;
use gatewatch_domain::{ApprovalDecision, MigrationPlanState, ObservedState, RequestDescription};

use super::error::{ActuatorError, StatusSourceError};

// =============================================================================
// Request Ports
// =============================================================================

/// Read side of the request queue.
///
/// Implementations must answer from the live system on every call. Caching
/// a reading between calls would defeat polling.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestStatusSource: Send + Sync {
    /// Current approval state of the request matching `description`, or
    /// `ObservedState::Unknown` if no request matches yet.
    async fn current_state(
        &self,
        description: &RequestDescription,
    ) -> Result<ObservedState, StatusSourceError>;
}

/// Write side of the request queue: the approver.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApprovalActuator: Send + Sync {
    /// Submit `decision` for the request matching `description`.
    ///
    /// Fails with `ActuatorError::NotApprovable` (and changes nothing) if
    /// the request is not pending approval.
    async fn submit_decision(
        &self,
        description: &RequestDescription,
        decision: ApprovalDecision,
        reason: &str,
    ) -> Result<(), ActuatorError>;
}

// =============================================================================
// Migration Ports
// =============================================================================

/// Read side of the migration plan listing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MigrationPlanSource: Send + Sync {
    /// Current state of the named plan, or `None` if it is not listed yet.
    async fn plan_state(&self, plan_name: &str)
        -> Result<Option<MigrationPlanState>, StatusSourceError>;
}
