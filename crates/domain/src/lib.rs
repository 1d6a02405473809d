//! Gatewatch domain types.
//!
//! Vocabulary shared by the engine's ports, adapters and use cases:
//! approval states observed on service requests, the descriptions used to
//! look requests up, and migration plan milestones.

pub mod error;
pub mod value_objects;

pub use error::DomainError;
pub use value_objects::{
    ApprovalDecision, ApprovalState, ApprovalType, DescriptionMatch, MigrationPlanState,
    ObservedState, RequestDescription, RequestKind, RETIREMENT_PREFIX,
};
