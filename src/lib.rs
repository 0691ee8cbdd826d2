pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::gateway::PaymentGateway;
use crate::domain::stores::SettingsStore;
use crate::services::credentials::CredentialResolver;
use crate::services::reconciliation::ReconciliationEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    /// Swapped out when an admin updates the gateway settings, so new
    /// credentials apply without a restart.
    pub gateway: Arc<RwLock<Arc<dyn PaymentGateway>>>,
    pub settings: Arc<dyn SettingsStore>,
    pub resolver: Arc<CredentialResolver>,
    pub public_base_url: Arc<str>,
}
