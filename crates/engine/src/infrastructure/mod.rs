//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod manageiq;
pub mod memory_ledger;
pub mod ports;
pub mod settings;
