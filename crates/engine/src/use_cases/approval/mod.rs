//! Manual approval verification.
//!
//! Confirms that a service provisioning or retirement request submitted
//! under manual approval waits in `Pending Approval`, submits the approver's
//! decision, and confirms the resulting terminal state.

use std::sync::Arc;
use std::time::Duration;

use gatewatch_domain::{ApprovalDecision, ApprovalState, ObservedState, RequestDescription};

use crate::infrastructure::ports::{
    ActuatorError, ApprovalActuator, RequestStatusSource, StatusSourceError,
};
use crate::use_cases::polling::{wait_for, PollConfigError, PollError, PollSettings};

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollResult {
    /// Always `true`: an unmet wait is reported as `VerifyError::Timeout`.
    pub satisfied: bool,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Both waits of a full manual-approval run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualApprovalReport {
    pub pending: PollResult,
    pub approved: PollResult,
}

/// Drives requests through the manual-approval gate and asserts each
/// transition.
pub struct ApprovalWorkflowVerifier {
    status: Arc<dyn RequestStatusSource>,
    actuator: Arc<dyn ApprovalActuator>,
}

impl ApprovalWorkflowVerifier {
    pub fn new(status: Arc<dyn RequestStatusSource>, actuator: Arc<dyn ApprovalActuator>) -> Self {
        Self { status, actuator }
    }

    /// Wait until the request reaches `expected`.
    ///
    /// # Arguments
    /// * `description` - Lookup key for the request
    /// * `expected` - State to wait for
    /// * `timeout` - Upper bound on the wait; must exceed `poll_interval`
    /// * `poll_interval` - Pause between two status queries
    ///
    /// # Returns
    /// * `Ok(PollResult)` - The state was observed
    /// * `Err(VerifyError::Configuration)` - Invalid timeout/interval, nothing was queried
    /// * `Err(VerifyError::Timeout)` - Deadline passed; carries the last observed state
    /// * `Err(VerifyError::Source)` - The status source failed
    pub async fn await_state(
        &self,
        description: &RequestDescription,
        expected: ApprovalState,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<PollResult, VerifyError> {
        let settings = PollSettings::new(timeout, poll_interval)?;
        self.await_state_with(description, expected, &settings).await
    }

    /// Same as [`Self::await_state`] with pre-validated bounds.
    ///
    /// A request that is not found yet reads as `Unknown` and polling
    /// simply continues; it may not have been created yet.
    pub async fn await_state_with(
        &self,
        description: &RequestDescription,
        expected: ApprovalState,
        settings: &PollSettings,
    ) -> Result<PollResult, VerifyError> {
        tracing::debug!(
            description = %description,
            expected = %expected,
            timeout_ms = settings.timeout().as_millis() as u64,
            interval_ms = settings.interval().as_millis() as u64,
            "Waiting for request approval state"
        );

        let outcome = wait_for(
            settings,
            || async move {
                let observed = self.status.current_state(description).await?;
                tracing::debug!(
                    description = %description,
                    observed = %observed,
                    "Polled request approval state"
                );
                Ok::<_, StatusSourceError>(observed)
            },
            |observed: &ObservedState| observed.is(expected),
        )
        .await;

        match outcome {
            Ok(polled) => {
                tracing::info!(
                    description = %description,
                    state = %expected,
                    attempts = polled.attempts,
                    elapsed_ms = polled.elapsed.as_millis() as u64,
                    "Request reached expected approval state"
                );
                Ok(PollResult {
                    satisfied: true,
                    attempts: polled.attempts,
                    elapsed: polled.elapsed,
                })
            }
            Err(PollError::TimedOut {
                last,
                attempts,
                elapsed,
            }) => {
                tracing::warn!(
                    description = %description,
                    expected = %expected,
                    last = %last,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Timed out waiting for request approval state"
                );
                Err(VerifyError::Timeout {
                    description: description.to_string(),
                    expected,
                    last,
                    attempts,
                    elapsed,
                })
            }
            Err(PollError::Probe(e)) => Err(VerifyError::Source(e)),
        }
    }

    /// Approve a request that is pending approval.
    ///
    /// Callers confirm the transition with a following
    /// `await_state(.., ApprovalState::Approved, ..)`.
    pub async fn approve(
        &self,
        description: &RequestDescription,
        reason: &str,
    ) -> Result<(), VerifyError> {
        self.decide(description, ApprovalDecision::Approve, reason)
            .await
    }

    /// Deny a request that is pending approval.
    pub async fn deny(&self, description: &RequestDescription, reason: &str) -> Result<(), VerifyError> {
        self.decide(description, ApprovalDecision::Deny, reason).await
    }

    async fn decide(
        &self,
        description: &RequestDescription,
        decision: ApprovalDecision,
        reason: &str,
    ) -> Result<(), VerifyError> {
        match self
            .actuator
            .submit_decision(description, decision, reason)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    description = %description,
                    decision = %decision,
                    reason,
                    "Submitted approval decision"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    description = %description,
                    decision = %decision,
                    error = %e,
                    "Approval decision rejected"
                );
                Err(e.into())
            }
        }
    }

    /// Full manual-approval run: wait for `Pending Approval`, approve, wait
    /// for `Approved`. Each wait gets the full `settings` budget.
    pub async fn verify_manual_approval(
        &self,
        description: &RequestDescription,
        reason: &str,
        settings: &PollSettings,
    ) -> Result<ManualApprovalReport, VerifyError> {
        let pending = self
            .await_state_with(description, ApprovalState::PendingApproval, settings)
            .await?;
        self.approve(description, reason).await?;
        let approved = self
            .await_state_with(description, ApprovalState::Approved, settings)
            .await?;

        Ok(ManualApprovalReport { pending, approved })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Invalid polling configuration: {0}")]
    Configuration(#[from] PollConfigError),

    #[error(
        "Request '{description}' did not reach {expected} after {attempts} attempts in {elapsed:?} (last state: {last})"
    )]
    Timeout {
        description: String,
        expected: ApprovalState,
        last: ObservedState,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("Request '{description}' cannot be decided while {current}")]
    Precondition {
        description: String,
        current: ObservedState,
    },

    #[error("Status source error: {0}")]
    Source(#[from] StatusSourceError),

    #[error("Approval actuator error: {0}")]
    Actuator(ActuatorError),
}

impl VerifyError {
    /// Last observed state, when this is a timeout.
    pub fn last_state(&self) -> Option<ObservedState> {
        match self {
            Self::Timeout { last, .. } => Some(*last),
            _ => None,
        }
    }
}

impl From<ActuatorError> for VerifyError {
    fn from(err: ActuatorError) -> Self {
        match err {
            ActuatorError::NotApprovable {
                description,
                current,
            } => Self::Precondition {
                description,
                current,
            },
            other => Self::Actuator(other),
        }
    }
}
