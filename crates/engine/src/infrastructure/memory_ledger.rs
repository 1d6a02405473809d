//! In-memory request ledger for development and testing
//!
//! Stands in for the application's request queue: requests are submitted
//! with a `RequestKind`, start in the state their `ApprovalType` dictates,
//! and move only when a decision is submitted. Nothing is persisted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use gatewatch_domain::{
    ApprovalDecision, ApprovalState, ApprovalType, DescriptionMatch, DomainError, ObservedState,
    RequestDescription, RequestKind,
};

use crate::infrastructure::ports::{
    ActuatorError, ApprovalActuator, ClockPort, RequestStatusSource, StatusSourceError,
};

/// One request row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub kind: RequestKind,
    pub description: RequestDescription,
    pub state: ApprovalState,
    /// Reason given with the last decision, if any.
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory request queue implementing both request ports.
pub struct InMemoryRequestLedger {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
    approval_type: ApprovalType,
    matching: DescriptionMatch,
    clock: Arc<dyn ClockPort>,
}

impl InMemoryRequestLedger {
    pub fn new(approval_type: ApprovalType, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            approval_type,
            matching: DescriptionMatch::default(),
            clock,
        }
    }

    pub fn with_matching(mut self, matching: DescriptionMatch) -> Self {
        self.matching = matching;
        self
    }

    /// Record a newly submitted request.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the kind yields no valid
    /// description.
    pub async fn submit(&self, kind: RequestKind) -> Result<LedgerEntry, DomainError> {
        let description = kind.description()?;
        let now = self.clock.now();
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            kind,
            description,
            state: self.approval_type.initial_state(),
            reason: None,
            created_at: now,
            updated_at: now,
        };

        tracing::debug!(
            request_id = %entry.id,
            description = %entry.description,
            state = %entry.state,
            approval_class = entry.kind.approval_class(),
            approval_type = %self.approval_type,
            "Recorded request"
        );

        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    /// Most recent request matching `description`.
    pub async fn find(&self, description: &RequestDescription) -> Option<LedgerEntry> {
        let entries = self.entries.read().await;
        Self::latest_index(&entries, description, self.matching).map(|idx| entries[idx].clone())
    }

    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().await.clone()
    }

    fn latest_index(
        entries: &[LedgerEntry],
        description: &RequestDescription,
        matching: DescriptionMatch,
    ) -> Option<usize> {
        // Later submissions win, like a listing sorted by creation time.
        entries
            .iter()
            .rposition(|entry| description.matches(entry.description.as_str(), matching))
    }
}

#[async_trait]
impl RequestStatusSource for InMemoryRequestLedger {
    async fn current_state(
        &self,
        description: &RequestDescription,
    ) -> Result<ObservedState, StatusSourceError> {
        Ok(self
            .find(description)
            .await
            .map(|entry| entry.state)
            .into())
    }
}

#[async_trait]
impl ApprovalActuator for InMemoryRequestLedger {
    async fn submit_decision(
        &self,
        description: &RequestDescription,
        decision: ApprovalDecision,
        reason: &str,
    ) -> Result<(), ActuatorError> {
        let mut entries = self.entries.write().await;
        let Some(idx) = Self::latest_index(&entries, description, self.matching) else {
            return Err(ActuatorError::not_approvable(
                description,
                ObservedState::Unknown,
            ));
        };

        let entry = &mut entries[idx];
        let next = entry
            .state
            .apply(decision)
            .map_err(|_| ActuatorError::not_approvable(description, entry.state.into()))?;

        entry.state = next;
        entry.reason = Some(reason.to_string());
        entry.updated_at = self.clock.now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use chrono::TimeZone;

    fn ledger(approval_type: ApprovalType) -> InMemoryRequestLedger {
        let clock = FixedClock(Utc.with_ymd_and_hms(2019, 4, 11, 9, 30, 0).unwrap());
        InMemoryRequestLedger::new(approval_type, Arc::new(clock))
    }

    fn provision(name: &str) -> RequestKind {
        RequestKind::ServiceProvision {
            catalog_item: name.to_string(),
        }
    }

    fn desc(s: &str) -> RequestDescription {
        RequestDescription::new(s).unwrap()
    }

    #[tokio::test]
    async fn manual_requests_start_pending() {
        let ledger = ledger(ApprovalType::Manual);
        let entry = ledger.submit(provision("svc-42")).await.unwrap();

        assert_eq!(entry.state, ApprovalState::PendingApproval);
        assert_eq!(
            ledger.current_state(&desc("svc-42")).await.unwrap(),
            ObservedState::Known(ApprovalState::PendingApproval)
        );
    }

    #[tokio::test]
    async fn auto_requests_start_approved() {
        let ledger = ledger(ApprovalType::Auto);
        ledger.submit(provision("svc-1")).await.unwrap();

        assert_eq!(
            ledger.current_state(&desc("svc-1")).await.unwrap(),
            ObservedState::Known(ApprovalState::Approved)
        );
    }

    #[tokio::test]
    async fn missing_request_reads_unknown() {
        let ledger = ledger(ApprovalType::Manual);
        assert_eq!(
            ledger.current_state(&desc("nope")).await.unwrap(),
            ObservedState::Unknown
        );
    }

    #[tokio::test]
    async fn approve_moves_pending_to_approved() {
        let ledger = ledger(ApprovalType::Manual);
        ledger.submit(provision("svc-42")).await.unwrap();

        ledger
            .submit_decision(&desc("svc-42"), ApprovalDecision::Approve, "ok")
            .await
            .unwrap();

        let entry = ledger.find(&desc("svc-42")).await.unwrap();
        assert_eq!(entry.state, ApprovalState::Approved);
        assert_eq!(entry.reason.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn decision_stamps_update_time() {
        let submitted = Utc.with_ymd_and_hms(2019, 4, 11, 9, 30, 0).unwrap();
        let decided = Utc.with_ymd_and_hms(2019, 4, 11, 9, 45, 0).unwrap();
        let mut clock = crate::infrastructure::ports::MockClockPort::new();
        let mut seq = mockall::Sequence::new();
        clock
            .expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(submitted);
        clock
            .expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(decided);
        let ledger = InMemoryRequestLedger::new(ApprovalType::Manual, Arc::new(clock));
        ledger.submit(provision("svc-42")).await.unwrap();

        ledger
            .submit_decision(&desc("svc-42"), ApprovalDecision::Approve, "ok")
            .await
            .unwrap();

        let entry = ledger.find(&desc("svc-42")).await.unwrap();
        assert_eq!(entry.created_at, submitted);
        assert_eq!(entry.updated_at, decided);
    }

    #[tokio::test]
    async fn decision_on_resolved_request_changes_nothing() {
        let ledger = ledger(ApprovalType::Manual);
        ledger.submit(provision("svc-7")).await.unwrap();
        ledger
            .submit_decision(&desc("svc-7"), ApprovalDecision::Deny, "no quota")
            .await
            .unwrap();

        let result = ledger
            .submit_decision(&desc("svc-7"), ApprovalDecision::Approve, "retry")
            .await;

        match result {
            Err(ActuatorError::NotApprovable { current, .. }) => {
                assert_eq!(current, ObservedState::Known(ApprovalState::Denied));
            }
            other => panic!("expected NotApprovable, got {:?}", other),
        }
        let entry = ledger.find(&desc("svc-7")).await.unwrap();
        assert_eq!(entry.state, ApprovalState::Denied);
        assert_eq!(entry.reason.as_deref(), Some("no quota"));
    }

    #[tokio::test]
    async fn decision_on_missing_request_is_not_approvable() {
        let ledger = ledger(ApprovalType::Manual);
        let result = ledger
            .submit_decision(&desc("ghost"), ApprovalDecision::Approve, "ok")
            .await;

        assert!(matches!(
            result,
            Err(ActuatorError::NotApprovable {
                current: ObservedState::Unknown,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn partial_matching_finds_retirement_requests() {
        let ledger = ledger(ApprovalType::Manual);
        ledger
            .submit(RequestKind::ServiceRetirement {
                service_name: "db-tier".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            ledger.current_state(&desc("db-tier")).await.unwrap(),
            ObservedState::Known(ApprovalState::PendingApproval)
        );
    }

    #[tokio::test]
    async fn exact_matching_ignores_substrings() {
        let ledger = ledger(ApprovalType::Manual).with_matching(DescriptionMatch::Exact);
        ledger.submit(provision("svc-42-large")).await.unwrap();

        assert_eq!(
            ledger.current_state(&desc("svc-42")).await.unwrap(),
            ObservedState::Unknown
        );
    }

    #[tokio::test]
    async fn latest_submission_wins() {
        let ledger = ledger(ApprovalType::Manual);
        ledger.submit(provision("svc-3")).await.unwrap();
        ledger
            .submit_decision(&desc("svc-3"), ApprovalDecision::Approve, "first")
            .await
            .unwrap();
        let second = ledger.submit(provision("svc-3")).await.unwrap();

        let found = ledger.find(&desc("svc-3")).await.unwrap();
        assert_eq!(found.id, second.id);
        assert_eq!(found.state, ApprovalState::PendingApproval);
        assert_eq!(ledger.entries().await.len(), 2);
    }
}
