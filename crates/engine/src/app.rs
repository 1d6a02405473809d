//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    manageiq::ManageIqClient,
    ports::{ApprovalActuator, MigrationPlanSource, RequestStatusSource},
    settings::WatchSettings,
};
use crate::use_cases::{ApprovalWorkflowVerifier, MigrationPlanWatcher};

/// Main application state.
///
/// Holds the settings the binary was started with and the use cases built
/// on top of the injected ports.
pub struct App {
    pub settings: WatchSettings,
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub approval: Arc<ApprovalWorkflowVerifier>,
    pub migration: Arc<MigrationPlanWatcher>,
}

impl App {
    pub fn new(
        settings: WatchSettings,
        status: Arc<dyn RequestStatusSource>,
        actuator: Arc<dyn ApprovalActuator>,
        plans: Arc<dyn MigrationPlanSource>,
    ) -> Self {
        let approval = Arc::new(ApprovalWorkflowVerifier::new(status, actuator));
        let migration = Arc::new(MigrationPlanWatcher::new(plans));
        Self {
            settings,
            use_cases: UseCases {
                approval,
                migration,
            },
        }
    }

    /// Wire every port to one ManageIQ client.
    pub fn with_manageiq(settings: WatchSettings) -> Self {
        let client = Arc::new(ManageIqClient::from_settings(&settings));
        Self::new(settings, client.clone(), client.clone(), client)
    }
}
