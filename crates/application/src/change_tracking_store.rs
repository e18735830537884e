use async_trait::async_trait;
use ledgerline_core::{AppError, AppResult};
use ledgerline_domain::{AuditAction, DiffEngine};

use crate::{
    AuditRecorder, EntityData, EntityFilter, EntityOrder, EntityStore, entity_ports::entity_id,
};

/// Entity store decorator that records an audit trail for every mutation.
///
/// Wraps any raw [`EntityStore`] and exposes the same port. The audit write
/// happens strictly after the underlying write succeeds; a failed write
/// propagates unchanged and is never audited.
pub struct ChangeTrackingStore<S> {
    entity: String,
    inner: S,
    diff_engine: DiffEngine,
    recorder: AuditRecorder,
}

impl<S> ChangeTrackingStore<S>
where
    S: EntityStore,
{
    /// Wraps `inner`, auditing mutations under the given entity name.
    #[must_use]
    pub fn new(
        entity: impl Into<String>,
        inner: S,
        diff_engine: DiffEngine,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            entity: entity.into(),
            inner,
            diff_engine,
            recorder,
        }
    }

    /// Returns the wrapped raw store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn existing(&self, id: &str) -> AppResult<EntityData> {
        self.inner
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} '{id}' not found", self.entity)))
    }

    async fn audit(
        &self,
        entity_id: &str,
        action: AuditAction,
        before: Option<&EntityData>,
        after: Option<&EntityData>,
    ) {
        let outcome = self
            .diff_engine
            .compute(self.entity.as_str(), action, before, after);
        self.recorder
            .record(self.entity.as_str(), entity_id, action, outcome)
            .await;
    }
}

#[async_trait]
impl<S> EntityStore for ChangeTrackingStore<S>
where
    S: EntityStore,
{
    async fn create(&self, data: EntityData) -> AppResult<EntityData> {
        let created = self.inner.create(data).await?;
        self.audit(entity_id(&created), AuditAction::Create, None, Some(&created))
            .await;
        Ok(created)
    }

    async fn update(&self, id: &str, patch: EntityData) -> AppResult<EntityData> {
        let before = self.existing(id).await?;
        let after = self.inner.update(id, patch).await?;
        self.audit(id, AuditAction::Update, Some(&before), Some(&after))
            .await;
        Ok(after)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let before = self.existing(id).await?;
        self.inner.delete(id).await?;
        self.audit(id, AuditAction::Delete, Some(&before), None).await;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<EntityData>> {
        self.inner.find_by_id(id).await
    }

    async fn find_many(
        &self,
        filter: EntityFilter,
        order: EntityOrder,
        limit: usize,
    ) -> AppResult<Vec<EntityData>> {
        self.inner.find_many(filter, order, limit).await
    }
}
