//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Reading request approval state (could swap REST -> UI scraping)
//! - Submitting approval decisions
//! - Reading migration plan state
//! - Clock (for testing)

mod error;
mod external;
mod testing;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{ApprovalActuator, MigrationPlanSource, RequestStatusSource};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::{MockApprovalActuator, MockMigrationPlanSource, MockRequestStatusSource};

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{ActuatorError, StatusSourceError};
