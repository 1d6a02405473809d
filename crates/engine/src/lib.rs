//! Gatewatch Engine library.
//!
//! Verifies manual-approval workflows on a ManageIQ appliance: waits for
//! service requests to reach approval states, submits decisions, and
//! watches migration plan milestones.
//!
//! ## Structure
//!
//! - `use_cases/` - Polling primitive and the workflows built on it
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
