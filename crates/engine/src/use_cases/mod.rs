//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.
//! Use cases orchestrate across ports to fulfill user stories.

pub mod approval;
pub mod migration;
pub mod polling;

// Re-export main types
pub use approval::{ApprovalWorkflowVerifier, ManualApprovalReport, PollResult, VerifyError};
pub use migration::{MigrationPlanWatcher, MigrationWatchError, ReachedMilestone};
pub use polling::{wait_for, PollConfigError, PollError, PollSettings, Polled};
