//! Business logic services

pub mod audit;
pub mod circulation;
pub mod fines;
pub mod inventory;

use std::sync::Arc;

use crate::{config::CirculationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub inventory: inventory::InventoryService,
    pub circulation: circulation::CirculationService,
    pub fines: fines::FinesService,
}

impl Services {
    /// Create all services with the given repository, circulation policy
    /// and audit emitter
    pub fn new(
        repository: Repository,
        config: CirculationConfig,
        audit: Arc<dyn audit::AuditEmitter>,
    ) -> Self {
        Self {
            inventory: inventory::InventoryService::new(repository.clone(), audit.clone()),
            circulation: circulation::CirculationService::new(
                repository.clone(),
                config,
                audit.clone(),
            ),
            fines: fines::FinesService::new(repository, audit),
        }
    }

    /// Create all services with the Postgres-backed activity log as the
    /// audit emitter
    pub fn with_activity_log(repository: Repository, config: CirculationConfig) -> Self {
        let audit = Arc::new(audit::ActivityLogStore::new(
            repository.activity_logs.clone(),
        ));
        Self::new(repository, config, audit)
    }
}
