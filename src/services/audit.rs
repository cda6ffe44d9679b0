//! Audit emission seam
//!
//! The engine reports every committed transition to an [`AuditEmitter`].
//! Emission is fire-and-forget: it happens after the primary transaction
//! has committed, and a failing emitter is logged, never allowed to abort
//! or roll back the transition it described.

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::Actor,
    repository::activity_logs::ActivityLogsRepository,
};

/// Receiver for committed-transition descriptions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditEmitter: Send + Sync {
    async fn record(&self, actor: &Actor, action: &str) -> AppResult<()>;
}

/// Emit an audit entry, swallowing (but logging) emitter failures.
pub(crate) async fn emit(audit: &dyn AuditEmitter, actor: &Actor, action: String) {
    if let Err(e) = audit.record(actor, &action).await {
        tracing::warn!(actor = %actor.username, %action, "audit emission failed: {}", e);
    }
}

/// Postgres-backed emitter writing to the activity log table
#[derive(Clone)]
pub struct ActivityLogStore {
    repository: ActivityLogsRepository,
}

impl ActivityLogStore {
    pub fn new(repository: ActivityLogsRepository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl AuditEmitter for ActivityLogStore {
    async fn record(&self, actor: &Actor, action: &str) -> AppResult<()> {
        self.repository
            .insert(Some(actor.id), &actor.username, &actor.role, action)
            .await
    }
}
