//! Migration plan milestone watching.
//!
//! Observes a V2V migration plan as it advances through its milestones.
//! The plan is driven entirely by the application; this only reads it.

use std::sync::Arc;
use std::time::Duration;

use gatewatch_domain::MigrationPlanState;

use crate::infrastructure::ports::{MigrationPlanSource, StatusSourceError};
use crate::use_cases::polling::{wait_for, PollError, PollSettings};

/// A milestone that was reached, and how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachedMilestone {
    pub milestone: MigrationPlanState,
    /// State actually seen; a later milestone if the plan moved past this
    /// one between two polls.
    pub observed: MigrationPlanState,
    pub attempts: u32,
    pub elapsed: Duration,
}

pub struct MigrationPlanWatcher {
    plans: Arc<dyn MigrationPlanSource>,
}

impl MigrationPlanWatcher {
    pub fn new(plans: Arc<dyn MigrationPlanSource>) -> Self {
        Self { plans }
    }

    /// Wait for each of `milestones` in order, each with the full
    /// `settings` budget.
    ///
    /// A milestone counts as reached when the plan reports it or any
    /// milestone listed after it, so a plan that moves quickly does not
    /// strand the watcher on a state it skipped past. `Failed` ends the
    /// watch at once unless it is itself the milestone awaited.
    pub async fn await_milestones(
        &self,
        plan_name: &str,
        milestones: &[MigrationPlanState],
        settings: &PollSettings,
    ) -> Result<Vec<ReachedMilestone>, MigrationWatchError> {
        let mut reached = Vec::with_capacity(milestones.len());

        for (position, milestone) in milestones.iter().copied().enumerate() {
            let remaining = &milestones[position..];
            let outcome = wait_for(
                settings,
                || async move { self.plans.plan_state(plan_name).await },
                |observed: &Option<MigrationPlanState>| match observed {
                    Some(state) if state.is_failure() && milestone != *state => true,
                    Some(state) => remaining.contains(state),
                    None => false,
                },
            )
            .await;

            match outcome {
                Ok(polled) => {
                    // The predicate never accepts an unlisted plan.
                    let observed = polled.value.ok_or_else(|| MigrationWatchError::TimedOut {
                        plan: plan_name.to_string(),
                        milestone,
                        last: None,
                    })?;
                    if observed.is_failure() && milestone != observed {
                        tracing::warn!(
                            plan = plan_name,
                            awaiting = %milestone,
                            "Migration plan failed"
                        );
                        return Err(MigrationWatchError::PlanFailed {
                            plan: plan_name.to_string(),
                            awaiting: milestone,
                        });
                    }
                    tracing::info!(
                        plan = plan_name,
                        milestone = %milestone,
                        observed = %observed,
                        attempts = polled.attempts,
                        "Migration plan reached milestone"
                    );
                    reached.push(ReachedMilestone {
                        milestone,
                        observed,
                        attempts: polled.attempts,
                        elapsed: polled.elapsed,
                    });
                }
                Err(PollError::TimedOut { last, elapsed, .. }) => {
                    tracing::warn!(
                        plan = plan_name,
                        milestone = %milestone,
                        last = ?last,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Timed out waiting for migration plan milestone"
                    );
                    return Err(MigrationWatchError::TimedOut {
                        plan: plan_name.to_string(),
                        milestone,
                        last,
                    });
                }
                Err(PollError::Probe(e)) => return Err(MigrationWatchError::Source(e)),
            }
        }

        Ok(reached)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationWatchError {
    #[error("Migration plan '{plan}' did not reach {milestone} (last state: {last:?})")]
    TimedOut {
        plan: String,
        milestone: MigrationPlanState,
        last: Option<MigrationPlanState>,
    },

    #[error("Migration plan '{plan}' failed while awaiting {awaiting}")]
    PlanFailed {
        plan: String,
        awaiting: MigrationPlanState,
    },

    #[error("Status source error: {0}")]
    Source(#[from] StatusSourceError),
}
