//! Value objects - Immutable objects defined by their attributes

mod approval;
mod description;
mod migration;

pub use approval::{ApprovalDecision, ApprovalState, ApprovalType, ObservedState, RequestKind};
pub use description::{DescriptionMatch, RequestDescription, RETIREMENT_PREFIX};
pub use migration::MigrationPlanState;
